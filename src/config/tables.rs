//! Building controller tables from a validated policy file.

use crate::config::schema::{PolicyFile, TableFile};
use crate::controller::{ControllerTable, Traffic};
use crate::error::{ControllerError, Result};
use crate::routing::RouteMatcher;

/// Build the egress and ingress tables, with route matchers installed.
///
/// Every route is attempted; all registration errors are returned together.
pub fn build_tables(config: &PolicyFile) -> Result<(ControllerTable, ControllerTable)> {
    let mut errors = Vec::new();
    let egress = build_table(&config.egress, Traffic::Egress, &mut errors);
    let ingress = build_table(&config.ingress, Traffic::Ingress, &mut errors);
    if errors.is_empty() {
        Ok((egress, ingress))
    } else {
        Err(errors)
    }
}

fn build_table(file: &TableFile, traffic: Traffic, errors: &mut Vec<ControllerError>) -> ControllerTable {
    let table = match traffic {
        Traffic::Ingress => ControllerTable::ingress(),
        Traffic::Egress | Traffic::Ping => ControllerTable::egress(),
    };
    let mut collect = |context: String, result: Result<()>| {
        if let Err(errs) = result {
            errors.extend(errs.into_iter().map(|e| e.within(&context)));
        }
    };

    if let Some(route) = &file.default {
        collect(format!("{traffic} default"), table.set_default_controller(route.to_route(traffic)));
    }
    if let Some(route) = &file.host {
        let mut route = route.to_route(traffic);
        route.is_host = true;
        collect(format!("{traffic} host"), table.set_host_controller(route));
    }

    let mut matcher = RouteMatcher::new();
    for route in &file.routes {
        let context = format!("{traffic} route [{}]", route.name);
        let result = table.add_controller(route.to_route(traffic));
        if result.is_ok() && !matcher.add_route(route.name.clone(), &route.pattern) {
            tracing::debug!(route = %route.name, "Route has no pattern, reachable by name only");
        }
        collect(context, result);
    }
    for prefix in &file.bypass {
        matcher.add_bypass(prefix.clone());
    }
    tracing::info!(
        traffic = %traffic,
        routes = table.count(),
        rules = matcher.len(),
        "Controller table built"
    );
    matcher.install(&table);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use crate::controller::ControllerKind;

    #[test]
    fn test_build_tables() {
        let config = parse_config(
            r#"
            [egress]
            bypass = ["/health"]
            default = { rate_limiter = { limit = 50.0, burst = 5 } }

            [[egress.routes]]
            name = "search"
            pattern = "/search"
            timeout = { timeout_ms = 1500 }

            [[egress.routes]]
            name = "by-name"

            [ingress.host]
            rate_limiter = { limit = 100.0, burst = 10 }
            "#,
        )
        .unwrap();
        let (egress, ingress) = build_tables(&config).unwrap();

        assert!(egress.is_egress());
        assert_eq!(egress.names(), vec!["by-name".to_string(), "search".to_string()]);
        assert_eq!(egress.lookup_uri("/search?q=1", "GET").name(), "search");
        assert_eq!(egress.lookup_uri("/other", "GET").kind(), ControllerKind::Default);
        assert!(egress.lookup_uri("/health", "GET").is_nil());
        assert!(egress.default_controller().rate_limiter().is_some());

        assert!(!ingress.is_egress());
        assert!(ingress.is_empty());
        assert!(ingress.host().rate_limiter().is_some());
    }

    #[test]
    fn test_build_tables_reports_errors() {
        let config: PolicyFile = toml::from_str(
            r#"
            [[egress.routes]]
            name = "r1"
            [[egress.routes]]
            name = "r1"
            "#,
        )
        .unwrap();
        let errs = build_tables(&config).unwrap_err();
        assert_eq!(
            errs[0].to_string(),
            "invalid argument: egress route [r1]: route name is a duplicate [r1]"
        );
    }
}
