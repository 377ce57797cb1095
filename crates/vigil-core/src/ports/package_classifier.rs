pub trait PackageClassifier: Send + Sync {
    fn is_trackable(&self, package: &str) -> bool;

    /// Human-readable name, or the package itself when no label is known.
    fn display_name(&self, package: &str) -> String;
}
