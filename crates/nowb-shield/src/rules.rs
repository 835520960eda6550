//! Ad-block rule file
//!
//! One substring rule per line. Blank lines and `#` comments are skipped.

use nowb_core::{NowbError, NowbResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Used when no rule file exists yet
pub const DEFAULT_RULES: &[&str] = &[
    "doubleclick.net",
    "adservice.google.",
    "googlesyndication.com",
    "googletagservices.com",
    "google-analytics.com",
    "scorecardresearch.com",
    "/ad-",
    "/ads/",
    "/advert",
    "ad.doubleclick.net",
];

/// First line of every saved rule file
pub const RULES_HEADER: &str = "# Project-NOWB AdBlock Rules";

/// Where a rule list came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleSource {
    Defaults,
    File(PathBuf),
    /// The file exists but could not be read; the list is empty
    Unreadable(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleList {
    pub rules: Vec<String>,
    pub source: RuleSource,
    pub warning: Option<String>,
}

impl RuleList {
    pub fn defaults() -> Self {
        Self {
            rules: default_rules(),
            source: RuleSource::Defaults,
            warning: None,
        }
    }
}

pub fn default_rules() -> Vec<String> {
    DEFAULT_RULES.iter().map(|rule| rule.to_string()).collect()
}

pub fn parse_rules(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Read the rule file, falling back to the built-in list when it is missing
pub fn load_rules(path: &Path) -> RuleList {
    match fs::read_to_string(path) {
        Ok(content) => {
            let rules = parse_rules(&content);
            log::info!("Loaded {} ad-block rules from {:?}", rules.len(), path);
            RuleList {
                rules,
                source: RuleSource::File(path.to_path_buf()),
                warning: None,
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::warn!("Ad-block rule file {:?} not found, using default rules", path);
            RuleList::defaults()
        }
        Err(e) => {
            log::error!("Failed to read ad-block rules {:?}: {}", path, e);
            RuleList {
                rules: Vec::new(),
                source: RuleSource::Unreadable(path.to_path_buf()),
                warning: Some(format!("Ad-block rules could not be read: {}", e)),
            }
        }
    }
}

pub fn save_rules(path: &Path, rules: &[String]) -> NowbResult<()> {
    let mut content = String::from(RULES_HEADER);
    content.push('\n');
    content.push_str(&rules.join("\n"));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content).map_err(|e| {
        log::error!("Failed to save ad-block rules to {:?}: {}", path, e);
        NowbError::adblock(format!("could not write {}: {}", path.display(), e))
    })?;
    log::info!("Saved {} ad-block rules to {:?}", rules.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_skips_comments_and_blanks() {
        let rules = parse_rules("# header\n\ndoubleclick.net\n  /ads/  \n#disabled.example\n");
        assert_eq!(rules, vec!["doubleclick.net", "/ads/"]);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let list = load_rules(&dir.path().join("adblock_list.txt"));
        assert_eq!(list.source, RuleSource::Defaults);
        assert_eq!(list.rules.len(), DEFAULT_RULES.len());
        assert!(list.warning.is_none());
    }

    #[test]
    fn test_unreadable_file_is_empty() {
        let dir = tempdir().unwrap();
        // a directory where the file should be
        let path = dir.path().join("adblock_list.txt");
        fs::create_dir(&path).unwrap();

        let list = load_rules(&path);
        assert!(list.rules.is_empty());
        assert!(list.warning.is_some());
        assert_eq!(list.source, RuleSource::Unreadable(path));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("adblock_list.txt");
        let rules = vec!["tracker.example".to_string(), "/banner/".to_string()];

        save_rules(&path, &rules).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(RULES_HEADER));

        let list = load_rules(&path);
        assert_eq!(list.rules, rules);
        assert_eq!(list.source, RuleSource::File(path));
    }

    #[test]
    fn test_save_failure_is_adblock_error() {
        let dir = tempdir().unwrap();
        let err = save_rules(dir.path(), &default_rules()).unwrap_err();
        assert!(matches!(err, NowbError::AdBlock(_)));
    }
}
