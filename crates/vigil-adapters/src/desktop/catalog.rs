//! Package catalog backed by freedesktop `.desktop` entries.
//!
//! A package id is the lowercased window class reported by the event source. An entry
//! contributes its `StartupWMClass` and the basename of its `Exec` command as ids.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use vigil_core::{CatalogError, ClassifierConfig, PackageCatalog};

pub struct DesktopEntryCatalog {
    application_dirs: Vec<PathBuf>,
    home_packages: HashSet<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct DesktopEntry {
    name: Option<String>,
    exec: Option<String>,
    startup_wm_class: Option<String>,
    entry_type: Option<String>,
    no_display: bool,
    hidden: bool,
}

impl DesktopEntry {
    fn parse(content: &str) -> Self {
        let mut entry = DesktopEntry::default();
        let mut in_main_section = false;

        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('[') {
                in_main_section = line == "[Desktop Entry]";
                continue;
            }

            if !in_main_section {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();

            match key.trim() {
                "Name" => entry.name = Some(value),
                "Exec" => entry.exec = Some(value),
                "StartupWMClass" => entry.startup_wm_class = Some(value),
                "Type" => entry.entry_type = Some(value),
                "NoDisplay" => entry.no_display = value.eq_ignore_ascii_case("true"),
                "Hidden" => entry.hidden = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }

        entry
    }

    fn is_launchable(&self) -> bool {
        !self.no_display
            && !self.hidden
            && self.entry_type.as_deref().unwrap_or("Application") == "Application"
    }

    fn package_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();

        if let Some(class) = &self.startup_wm_class {
            ids.push(class.to_lowercase());
        }

        if let Some(binary) = self.exec.as_deref().and_then(exec_basename) {
            ids.push(binary);
        }

        ids
    }
}

/// First word of an `Exec` line that is not an env assignment, without its directory.
fn exec_basename(exec: &str) -> Option<String> {
    let program = exec
        .split_whitespace()
        .find(|word| *word != "env" && !word.contains('='))?
        .trim_matches('"');

    Path::new(program)
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
}

impl DesktopEntryCatalog {
    pub fn new(application_dirs: Vec<PathBuf>, home_packages: HashSet<String>) -> Self {
        Self {
            application_dirs,
            home_packages,
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(
            config.application_dirs.clone(),
            config
                .home_packages
                .iter()
                .map(|package| package.to_lowercase())
                .collect(),
        )
    }

    /// Entries in directory order; the first entry for a given file name wins, matching
    /// XDG precedence where user directories shadow system ones.
    fn entries(&self) -> Vec<DesktopEntry> {
        let mut seen_files = HashSet::new();
        let mut entries = Vec::new();

        for directory in &self.application_dirs {
            let read_dir = match fs::read_dir(directory) {
                Ok(read_dir) => read_dir,
                Err(error) if error.kind() == ErrorKind::NotFound => continue,
                Err(error) => {
                    warn!(
                        %error,
                        directory = %directory.display(),
                        "cannot read application directory"
                    );
                    continue;
                }
            };

            for dir_entry in read_dir.flatten() {
                let path = dir_entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some("desktop") {
                    continue;
                }

                if !seen_files.insert(dir_entry.file_name()) {
                    continue;
                }

                match fs::read_to_string(&path) {
                    Ok(content) => entries.push(DesktopEntry::parse(&content)),
                    Err(error) => {
                        trace!(%error, path = %path.display(), "skipping unreadable entry")
                    }
                }
            }
        }

        entries
    }
}

impl PackageCatalog for DesktopEntryCatalog {
    fn home_packages(&self) -> Result<HashSet<String>, CatalogError> {
        Ok(self.home_packages.clone())
    }

    fn launchable_packages(&self) -> Result<HashSet<String>, CatalogError> {
        let packages: HashSet<String> = self
            .entries()
            .iter()
            .filter(|entry| entry.is_launchable())
            .flat_map(DesktopEntry::package_ids)
            .collect();

        debug!(count = packages.len(), "scanned launchable packages");
        Ok(packages)
    }

    fn has_launch_entry(&self, package: &str) -> Result<bool, CatalogError> {
        match which::which(package) {
            Ok(_) => Ok(true),
            Err(which::Error::CannotFindBinaryPath) => Ok(false),
            Err(error) => Err(CatalogError::Query {
                message: error.to_string(),
            }),
        }
    }

    fn application_label(&self, package: &str) -> Result<Option<String>, CatalogError> {
        let package = package.to_lowercase();

        Ok(self
            .entries()
            .into_iter()
            .find(|entry| entry.package_ids().contains(&package))
            .and_then(|entry| entry.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIREFOX: &str = "[Desktop Entry]
Type=Application
Name=Firefox Web Browser
Exec=/usr/lib/firefox/firefox %u
StartupWMClass=Firefox

[Desktop Action new-window]
Name=Open a New Window
Exec=/usr/lib/firefox/firefox --new-window %u
";

    const HIDDEN: &str = "[Desktop Entry]
Type=Application
Name=Portal
Exec=xdg-desktop-portal
NoDisplay=true
";

    fn write(directory: &Path, file: &str, content: &str) {
        fs::create_dir_all(directory).unwrap();
        fs::write(directory.join(file), content).unwrap();
    }

    #[test]
    fn parses_main_section_only() {
        let entry = DesktopEntry::parse(FIREFOX);

        assert_eq!(entry.name.as_deref(), Some("Firefox Web Browser"));
        assert_eq!(entry.exec.as_deref(), Some("/usr/lib/firefox/firefox %u"));
        assert_eq!(entry.startup_wm_class.as_deref(), Some("Firefox"));
        assert!(entry.is_launchable());
        assert_eq!(entry.package_ids(), vec!["firefox", "firefox"]);
    }

    #[test]
    fn exec_basename_skips_env_assignments() {
        assert_eq!(
            exec_basename("env GDK_BACKEND=x11 /opt/app/bin/slack --flag"),
            Some("slack".to_string())
        );
        assert_eq!(exec_basename("code --unity-launch %F"), Some("code".to_string()));
        assert_eq!(exec_basename(""), None);
    }

    #[test]
    fn launchable_packages_exclude_hidden_entries() {
        let directory = tempfile::tempdir().unwrap();
        write(directory.path(), "firefox.desktop", FIREFOX);
        write(directory.path(), "portal.desktop", HIDDEN);
        write(directory.path(), "README", "not an entry");

        let catalog =
            DesktopEntryCatalog::new(vec![directory.path().to_path_buf()], HashSet::new());
        let packages = catalog.launchable_packages().unwrap();

        assert_eq!(packages, HashSet::from(["firefox".to_string()]));
    }

    #[test]
    fn user_entries_shadow_system_entries() {
        let user = tempfile::tempdir().unwrap();
        let system = tempfile::tempdir().unwrap();
        write(
            user.path(),
            "firefox.desktop",
            &FIREFOX.replace("Firefox Web Browser", "My Firefox"),
        );
        write(system.path(), "firefox.desktop", FIREFOX);

        let catalog = DesktopEntryCatalog::new(
            vec![user.path().to_path_buf(), system.path().to_path_buf()],
            HashSet::new(),
        );

        assert_eq!(
            catalog.application_label("Firefox").unwrap(),
            Some("My Firefox".to_string())
        );
    }

    #[test]
    fn missing_directories_yield_empty_set() {
        let catalog = DesktopEntryCatalog::new(
            vec![PathBuf::from("/nonexistent/vigil/apps")],
            HashSet::new(),
        );

        assert!(catalog.launchable_packages().unwrap().is_empty());
        assert_eq!(catalog.application_label("firefox").unwrap(), None);
    }

    #[test]
    fn home_packages_come_from_config() {
        let config = ClassifierConfig {
            home_packages: HashSet::from(["Plasmashell".to_string()]),
            application_dirs: Vec::new(),
            ..Default::default()
        };

        let catalog = DesktopEntryCatalog::from_config(&config);

        assert_eq!(
            catalog.home_packages().unwrap(),
            HashSet::from(["plasmashell".to_string()])
        );
    }

    #[test]
    fn unknown_binary_has_no_launch_entry() {
        let catalog = DesktopEntryCatalog::new(Vec::new(), HashSet::new());

        assert!(!catalog
            .has_launch_entry("vigil-definitely-not-installed-binary")
            .unwrap());
    }
}
