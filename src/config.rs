//! Run configuration.
//!
//! A `FileAdditionRequest` is built once from the command line, validated before
//! any network activity, and never mutated afterwards.

use regex::Regex;
use thiserror::Error;

/// Default topic branch name.
pub const DEFAULT_TOPIC_BRANCH: &str = "git-file-adder";

/// Default repository name pattern; matches every repository.
pub const DEFAULT_REPO_PATTERN: &str = ".*";

/// Body used for every opened pull request.
pub const PROPOSAL_BODY: &str = "Created by git-file-adder";

/// Errors detected while validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "both a repository list and a repository pattern ({pattern:?}) were configured; choose one or the other"
    )]
    ConflictingSelectors { pattern: String },

    #[error("invalid repository pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("topic branch name must not be empty")]
    EmptyTopicBranch,

    #[error("topic branch {0:?} is the same as the base branch")]
    TopicIsBase(String),
}

/// How repositories are chosen from the organization's listing.
///
/// Exactly one mode is active.
#[derive(Debug, Clone)]
pub enum RepoSelector {
    /// Repositories whose name is in the list.
    Names(Vec<String>),

    /// Repositories whose whole name matches the pattern.
    Pattern {
        /// The pattern as supplied by the user.
        source: String,
        /// The compiled pattern, anchored at both ends.
        regex: Regex,
    },
}

impl RepoSelector {
    /// Builds a selector from the two mutually exclusive command-line options.
    ///
    /// An empty or absent list selects by pattern. A non-empty list together
    /// with a pattern other than the default is a configuration error.
    pub fn from_options(
        repo_list: Option<Vec<String>>,
        repo_pattern: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let pattern = repo_pattern.unwrap_or(DEFAULT_REPO_PATTERN);
        match repo_list {
            Some(names) if !names.is_empty() => {
                if pattern != DEFAULT_REPO_PATTERN {
                    return Err(ConfigError::ConflictingSelectors {
                        pattern: pattern.to_string(),
                    });
                }
                Ok(RepoSelector::Names(names))
            }
            _ => Self::pattern(pattern),
        }
    }

    /// Builds a whole-string pattern selector.
    pub fn pattern(pattern: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(&format!("^(?:{})$", pattern)).map_err(|source| {
            ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            }
        })?;
        Ok(RepoSelector::Pattern {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Returns true if the repository name is selected by this mode.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            RepoSelector::Names(names) => names.iter().any(|n| n == name),
            RepoSelector::Pattern { regex, .. } => regex.is_match(name),
        }
    }
}

impl std::fmt::Display for RepoSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepoSelector::Names(names) => write!(f, "list {:?}", names),
            RepoSelector::Pattern { source, .. } => write!(f, "pattern {:?}", source),
        }
    }
}

/// The process-scoped description of what to add, where, and how.
#[derive(Debug, Clone)]
pub struct FileAdditionRequest {
    /// Path within each repository where files are placed; may be empty.
    pub destination: String,

    /// Base branch override; each repository's default branch when absent.
    pub base_branch: Option<String>,

    /// Name of the topic branch created in each repository.
    pub topic_branch: String,

    /// Pull request title; derived from the file names when absent.
    pub message: Option<String>,

    /// Overwrite files that already exist instead of failing.
    pub update_existing: bool,

    pub selector: RepoSelector,
}

impl FileAdditionRequest {
    pub fn new(selector: RepoSelector) -> Self {
        FileAdditionRequest {
            destination: String::new(),
            base_branch: None,
            topic_branch: DEFAULT_TOPIC_BRANCH.to_string(),
            message: None,
            update_existing: false,
            selector,
        }
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Sets the base branch override; an empty name means "no override".
    pub fn with_base_branch(mut self, base: Option<String>) -> Self {
        self.base_branch = base.filter(|b| !b.is_empty());
        self
    }

    pub fn with_topic_branch(mut self, topic: impl Into<String>) -> Self {
        self.topic_branch = topic.into();
        self
    }

    /// Sets the pull request title; an empty message means "derive one".
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message.filter(|m| !m.is_empty());
        self
    }

    pub fn with_update_existing(mut self, update: bool) -> Self {
        self.update_existing = update;
        self
    }

    /// Checks the request for errors that can be detected without the network.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.topic_branch.trim().is_empty() {
            return Err(ConfigError::EmptyTopicBranch);
        }
        if self.base_branch.as_deref() == Some(self.topic_branch.as_str()) {
            return Err(ConfigError::TopicIsBase(self.topic_branch.clone()));
        }
        Ok(())
    }

    /// Returns the pull request title for the given local file names.
    pub fn proposal_title<S: AsRef<str>>(&self, file_names: &[S]) -> String {
        match &self.message {
            Some(message) => message.clone(),
            None => derive_proposal_message(file_names, &self.destination),
        }
    }
}

/// Derives a pull request title: `Add a, b` plus ` to <path>` when a
/// destination path is configured.
pub fn derive_proposal_message<S: AsRef<str>>(file_names: &[S], destination: &str) -> String {
    let names = file_names
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ");
    if destination.is_empty() {
        format!("Add {}", names)
    } else {
        format!("Add {} to {}", names, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn list_with_default_pattern_selects_by_name() {
        let selector =
            RepoSelector::from_options(Some(vec!["repo-a".into()]), Some(".*")).unwrap();
        assert!(matches!(selector, RepoSelector::Names(_)));
        assert!(selector.matches("repo-a"));
        assert!(!selector.matches("repo-b"));
    }

    #[test]
    fn list_with_custom_pattern_is_rejected() {
        let err =
            RepoSelector::from_options(Some(vec!["repo-a".into()]), Some("repo-.*")).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingSelectors { .. }));
    }

    #[test]
    fn empty_list_falls_back_to_pattern() {
        let selector = RepoSelector::from_options(Some(vec![]), Some("svc-.*")).unwrap();
        assert!(selector.matches("svc-billing"));
        assert!(!selector.matches("web"));
    }

    #[test]
    fn pattern_must_match_whole_name() {
        let selector = RepoSelector::pattern("api").unwrap();
        assert!(selector.matches("api"));
        assert!(!selector.matches("api-gateway"));
        assert!(!selector.matches("legacy-api"));
    }

    #[test]
    fn alternation_is_anchored_as_a_group() {
        let selector = RepoSelector::pattern("a|b").unwrap();
        assert!(selector.matches("a"));
        assert!(selector.matches("b"));
        assert!(!selector.matches("ab"));
        assert!(!selector.matches("xb"));
    }

    #[test]
    fn invalid_pattern_is_a_config_error() {
        let err = RepoSelector::pattern("(unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn derived_message_without_destination() {
        assert_eq!(
            derive_proposal_message(&["README.md", "LICENSE"], ""),
            "Add README.md, LICENSE"
        );
    }

    #[test]
    fn derived_message_with_destination() {
        assert_eq!(
            derive_proposal_message(&["CODEOWNERS"], ".github"),
            "Add CODEOWNERS to .github"
        );
    }

    #[test]
    fn explicit_message_wins() {
        let request = FileAdditionRequest::new(RepoSelector::pattern(".*").unwrap())
            .with_message(Some("Standardize license".into()));
        assert_eq!(request.proposal_title(&["LICENSE"]), "Standardize license");

        let request = request.with_message(Some(String::new()));
        assert_eq!(request.proposal_title(&["LICENSE"]), "Add LICENSE");
    }

    #[test]
    fn validate_rejects_bad_topic_branches() {
        let selector = RepoSelector::pattern(".*").unwrap();
        let request = FileAdditionRequest::new(selector.clone()).with_topic_branch(" ");
        assert!(matches!(request.validate(), Err(ConfigError::EmptyTopicBranch)));

        let request = FileAdditionRequest::new(selector)
            .with_base_branch(Some("main".into()))
            .with_topic_branch("main");
        assert!(matches!(request.validate(), Err(ConfigError::TopicIsBase(_))));
    }

    #[test]
    fn empty_base_override_means_default_branch() {
        let request = FileAdditionRequest::new(RepoSelector::pattern(".*").unwrap())
            .with_base_branch(Some(String::new()));
        assert_eq!(request.base_branch, None);
        assert!(request.validate().is_ok());
    }

    proptest! {
        #[test]
        fn literal_pattern_matches_only_itself(
            name in "[a-z][a-z0-9-]{0,20}",
            suffix in "[a-z0-9-]{1,5}",
        ) {
            let selector = RepoSelector::pattern(&regex::escape(&name)).unwrap();
            prop_assert!(selector.matches(&name));
            let longer = format!("{}{}", name, suffix);
            let prefixed = format!("{}{}", suffix, name);
            prop_assert!(!selector.matches(&longer));
            prop_assert!(!selector.matches(&prefixed));
        }
    }
}
