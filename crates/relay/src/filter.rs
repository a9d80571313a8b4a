//! Service selection

use log::debug;
use msgbridge_core::{Catalog, is_excluded};

/// Names of the services to bridge, in catalog (alphabetical) order.
///
/// Hard-excluded services are always left out. With `restrict_to_allow_list`
/// a service is kept only if its name occurs somewhere in `allow_list`;
/// otherwise the allow-list is ignored.
pub fn select_channels(
    catalog: &Catalog,
    allow_list: &str,
    restrict_to_allow_list: bool,
) -> Vec<String> {
    catalog
        .names()
        .filter(|name| {
            if is_excluded(name) {
                debug!("skipping internal service {}", name);
                return false;
            }
            !restrict_to_allow_list || allow_list.contains(name)
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use msgbridge_core::EXCLUDED_SERVICES;

    fn small_catalog() -> Catalog {
        Catalog::from_names(["carState", "liveLocation", "uiLayoutState"])
    }

    #[test]
    fn test_allow_list_substring_match() {
        let selected = select_channels(&small_catalog(), "carStateXYZ", true);
        assert_eq!(selected, vec!["carState"]);
    }

    #[test]
    fn test_unrestricted_ignores_allow_list() {
        let selected = select_channels(&small_catalog(), "carStateXYZ", false);
        assert_eq!(selected, vec!["carState", "liveLocation"]);
    }

    #[test]
    fn test_empty_allow_list() {
        assert!(select_channels(&small_catalog(), "", true).is_empty());
        assert_eq!(select_channels(&small_catalog(), "", false).len(), 2);
    }

    #[test]
    fn test_empty_catalog() {
        assert!(select_channels(&Catalog::default(), "carState", true).is_empty());
        assert!(select_channels(&Catalog::default(), "", false).is_empty());
    }

    #[test]
    fn test_excluded_services_never_selected() {
        let catalog = Catalog::builtin();
        let everything: String = catalog.names().collect::<Vec<_>>().join(",");

        let cases = [("", false), (everything.as_str(), true), (everything.as_str(), false)];
        for (allow_list, restrict) in cases {
            let selected = select_channels(&catalog, allow_list, restrict);
            for excluded in EXCLUDED_SERVICES {
                assert!(!selected.iter().any(|name| name == excluded));
            }
        }

        let selected = select_channels(&catalog, "", false);
        assert_eq!(selected.len(), catalog.len() - EXCLUDED_SERVICES.len());
    }

    #[test]
    fn test_output_is_sorted() {
        let selected = select_channels(&Catalog::builtin(), "", false);
        let mut sorted = selected.clone();
        sorted.sort();
        assert_eq!(selected, sorted);
    }
}
