//! Best-effort package classification on top of a [`PackageCatalog`].
//!
//! Catalog answers are cached for a bounded time. Any catalog failure degrades to
//! "trackable" so a transient query error never leaves the device unmonitored.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::ports::{Clock, PackageCatalog, PackageClassifier};

struct Cached<T> {
    value: T,
    fetched_at_ms: i64,
}

pub struct CachedPackageClassifier {
    catalog: Arc<dyn PackageCatalog>,
    clock: Arc<dyn Clock>,
    self_package: String,
    ttl_ms: i64,
    home_packages: Mutex<Option<Cached<HashSet<String>>>>,
    launchable_packages: Mutex<Option<Cached<HashSet<String>>>>,
    display_names: Mutex<HashMap<String, Cached<String>>>,
}

impl CachedPackageClassifier {
    pub fn new(
        catalog: Arc<dyn PackageCatalog>,
        clock: Arc<dyn Clock>,
        self_package: impl Into<String>,
        ttl_ms: i64,
    ) -> Self {
        Self {
            catalog,
            clock,
            self_package: self_package.into(),
            ttl_ms,
            home_packages: Mutex::new(None),
            launchable_packages: Mutex::new(None),
            display_names: Mutex::new(HashMap::new()),
        }
    }

    fn is_fresh(&self, fetched_at_ms: i64, now_ms: i64) -> bool {
        now_ms - fetched_at_ms < self.ttl_ms
    }

    fn is_home_package(&self, package: &str) -> bool {
        let now_ms = self.clock.now_ms();
        let Ok(mut cache) = self.home_packages.lock() else {
            return false;
        };

        if let Some(cached) = cache.as_ref() {
            if self.is_fresh(cached.fetched_at_ms, now_ms) {
                return cached.value.contains(package);
            }
        }

        match self.catalog.home_packages() {
            Ok(packages) => {
                let is_home = packages.contains(package);
                *cache = Some(Cached {
                    value: packages,
                    fetched_at_ms: now_ms,
                });
                is_home
            }
            Err(error) => {
                warn!(%error, package, "home package query failed, assuming not a launcher");
                false
            }
        }
    }

    /// `None` when the launchable set cannot be obtained or is empty.
    fn is_in_launchable_set(&self, package: &str) -> Option<bool> {
        let now_ms = self.clock.now_ms();
        let mut cache = self.launchable_packages.lock().ok()?;

        if let Some(cached) = cache.as_ref() {
            if self.is_fresh(cached.fetched_at_ms, now_ms) {
                return Some(cached.value.contains(package));
            }
        }

        match self.catalog.launchable_packages() {
            Ok(packages) if !packages.is_empty() => {
                let is_launchable = packages.contains(package);
                *cache = Some(Cached {
                    value: packages,
                    fetched_at_ms: now_ms,
                });
                Some(is_launchable)
            }
            Ok(_) => {
                debug!("launchable package set is empty");
                *cache = None;
                None
            }
            Err(error) => {
                warn!(%error, "launchable package query failed");
                *cache = None;
                None
            }
        }
    }

    fn has_launch_entry(&self, package: &str) -> bool {
        match self.catalog.has_launch_entry(package) {
            Ok(has_entry) => has_entry,
            Err(error) => {
                warn!(%error, package, "launch entry query failed, assuming trackable");
                true
            }
        }
    }
}

impl PackageClassifier for CachedPackageClassifier {
    fn is_trackable(&self, package: &str) -> bool {
        if package == self.self_package {
            return false;
        }

        if self.is_home_package(package) {
            return false;
        }

        match self.is_in_launchable_set(package) {
            Some(is_launchable) => is_launchable,
            None => self.has_launch_entry(package),
        }
    }

    fn display_name(&self, package: &str) -> String {
        let now_ms = self.clock.now_ms();

        if let Ok(names) = self.display_names.lock() {
            if let Some(cached) = names.get(package) {
                if self.is_fresh(cached.fetched_at_ms, now_ms) {
                    return cached.value.clone();
                }
            }
        }

        let name = match self.catalog.application_label(package) {
            Ok(Some(label)) if !label.trim().is_empty() => label,
            Ok(_) => package.to_string(),
            Err(error) => {
                warn!(%error, package, "application label lookup failed");
                return package.to_string();
            }
        };

        if let Ok(mut names) = self.display_names.lock() {
            names.insert(
                package.to_string(),
                Cached {
                    value: name.clone(),
                    fetched_at_ms: now_ms,
                },
            );
        }

        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CatalogError;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    const HOUR_MS: i64 = 60 * 60 * 1000;

    struct ManualClock(AtomicI64);

    impl ManualClock {
        fn advance(&self, delta_ms: i64) {
            self.0.fetch_add(delta_ms, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ms(&self) -> i64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct MockCatalog {
        home: HashSet<String>,
        launchable: HashSet<String>,
        executables: HashSet<String>,
        labels: HashMap<String, String>,
        failing: bool,
        home_queries: AtomicUsize,
        label_queries: AtomicUsize,
    }

    impl MockCatalog {
        fn error() -> CatalogError {
            CatalogError::Query {
                message: "service unavailable".to_string(),
            }
        }
    }

    impl PackageCatalog for MockCatalog {
        fn home_packages(&self) -> Result<HashSet<String>, CatalogError> {
            self.home_queries.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                return Err(Self::error());
            }
            Ok(self.home.clone())
        }

        fn launchable_packages(&self) -> Result<HashSet<String>, CatalogError> {
            if self.failing {
                return Err(Self::error());
            }
            Ok(self.launchable.clone())
        }

        fn has_launch_entry(&self, package: &str) -> Result<bool, CatalogError> {
            if self.failing {
                return Err(Self::error());
            }
            Ok(self.executables.contains(package))
        }

        fn application_label(&self, package: &str) -> Result<Option<String>, CatalogError> {
            self.label_queries.fetch_add(1, Ordering::SeqCst);
            if self.failing {
                return Err(Self::error());
            }
            Ok(self.labels.get(package).cloned())
        }
    }

    fn set(values: &[&str]) -> HashSet<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn classifier_with(catalog: MockCatalog) -> (CachedPackageClassifier, Arc<MockCatalog>, Arc<ManualClock>) {
        let catalog = Arc::new(catalog);
        let clock = Arc::new(ManualClock(AtomicI64::new(1_000_000)));
        let classifier =
            CachedPackageClassifier::new(catalog.clone(), clock.clone(), "vigil", HOUR_MS);
        (classifier, catalog, clock)
    }

    #[test]
    fn excludes_self_package() {
        let (classifier, _, _) = classifier_with(MockCatalog {
            launchable: set(&["vigil", "firefox"]),
            ..Default::default()
        });

        assert!(!classifier.is_trackable("vigil"));
        assert!(classifier.is_trackable("firefox"));
    }

    #[test]
    fn excludes_home_packages() {
        let (classifier, _, _) = classifier_with(MockCatalog {
            home: set(&["gnome-shell"]),
            launchable: set(&["gnome-shell", "firefox"]),
            ..Default::default()
        });

        assert!(!classifier.is_trackable("gnome-shell"));
    }

    #[test]
    fn requires_membership_in_launchable_set() {
        let (classifier, _, _) = classifier_with(MockCatalog {
            launchable: set(&["firefox"]),
            executables: set(&["xdg-desktop-portal"]),
            ..Default::default()
        });

        assert!(classifier.is_trackable("firefox"));
        assert!(!classifier.is_trackable("xdg-desktop-portal"));
    }

    #[test]
    fn falls_back_to_launch_entry_when_launchable_set_is_empty() {
        let (classifier, _, _) = classifier_with(MockCatalog {
            executables: set(&["alacritty"]),
            ..Default::default()
        });

        assert!(classifier.is_trackable("alacritty"));
        assert!(!classifier.is_trackable("polkit-agent"));
    }

    #[test]
    fn catalog_failures_assume_trackable() {
        let (classifier, _, _) = classifier_with(MockCatalog {
            failing: true,
            ..Default::default()
        });

        assert!(classifier.is_trackable("firefox"));
    }

    #[test]
    fn home_packages_are_cached_for_the_ttl() {
        let (classifier, catalog, clock) = classifier_with(MockCatalog {
            launchable: set(&["firefox"]),
            ..Default::default()
        });

        classifier.is_trackable("firefox");
        classifier.is_trackable("firefox");
        assert_eq!(catalog.home_queries.load(Ordering::SeqCst), 1);

        clock.advance(HOUR_MS);
        classifier.is_trackable("firefox");
        assert_eq!(catalog.home_queries.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn display_name_uses_label_and_caches_it() {
        let (classifier, catalog, _) = classifier_with(MockCatalog {
            labels: HashMap::from([("firefox".to_string(), "Firefox".to_string())]),
            ..Default::default()
        });

        assert_eq!(classifier.display_name("firefox"), "Firefox");
        assert_eq!(classifier.display_name("firefox"), "Firefox");
        assert_eq!(catalog.label_queries.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn display_name_falls_back_to_package() {
        let (classifier, _, _) = classifier_with(MockCatalog::default());
        assert_eq!(classifier.display_name("unknown-app"), "unknown-app");

        let (failing, _, _) = classifier_with(MockCatalog {
            failing: true,
            ..Default::default()
        });
        assert_eq!(failing.display_name("firefox"), "firefox");
    }
}
