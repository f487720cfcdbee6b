//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route names (non-empty, unique per table)
//! - Validate capability values (timeouts > 0, limits and bursts not negative)
//! - Reject host controllers where the table would refuse them
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PolicyFile → Result<(), Vec<ControllerError>>
//! - Runs before any table is built, using the same checks the tables apply

use std::collections::HashSet;

use crate::config::schema::{PolicyFile, RouteFile, TableFile};
use crate::controller::Traffic;
use crate::error::{ControllerError, Result};

pub fn validate_config(config: &PolicyFile) -> Result<()> {
    let mut errors = Vec::new();
    validate_table(&config.egress, Traffic::Egress, &mut errors);
    validate_table(&config.ingress, Traffic::Ingress, &mut errors);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_table(table: &TableFile, traffic: Traffic, errors: &mut Vec<ControllerError>) {
    let mut seen = HashSet::new();
    for route in &table.routes {
        let context = format!("{traffic} route [{}]", route.name);
        if route.name.trim().is_empty() {
            errors.push(ControllerError::argument("route name is empty").within(&context));
        } else if !seen.insert(route.name.as_str()) {
            errors.push(ControllerError::argument("route name is a duplicate").within(&context));
        }
        validate_route(route, traffic, &context, errors);
    }

    if let Some(route) = &table.default {
        validate_route(route, traffic, &format!("{traffic} default"), errors);
    }

    if let Some(route) = &table.host {
        let context = format!("{traffic} host");
        if traffic == Traffic::Egress {
            errors.push(
                ControllerError::argument("host controller configuration is not valid for egress traffic")
                    .within(&context),
            );
        }
        if route.retry.is_some() || route.timeout.is_some() {
            errors.push(
                ControllerError::argument(
                    "host controller configuration does not allow retry, timeout, or failover controllers",
                )
                .within(&context),
            );
        }
        validate_route(route, traffic, &context, errors);
    }

    for prefix in &table.bypass {
        if !prefix.starts_with('/') {
            errors.push(
                ControllerError::config(format!("bypass prefix must start with '/' [{prefix}]"))
                    .within(&format!("{traffic} table")),
            );
        }
    }
}

fn validate_route(route: &RouteFile, traffic: Traffic, context: &str, errors: &mut Vec<ControllerError>) {
    if let Err(errs) = route.to_route(traffic).validate() {
        errors.extend(errs.into_iter().map(|e| e.within(context)));
    }
}
