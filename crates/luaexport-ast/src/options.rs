//! Analysis options derived from `luaexport.toml`

use luaexport_config::{Config, DEFAULT_ANNOTATION_PREFIX};
use luaexport_manifest::ContainerKind;

/// Template names recognized as standard containers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRules {
    pub vector_templates: Vec<String>,
    pub map_templates: Vec<String>,
}

impl ContainerRules {
    /// Container family of a template name, `None` when it is not a known container
    pub fn classify(&self, template: &str) -> Option<ContainerKind> {
        let template = template.trim().trim_start_matches("::");
        if self.vector_templates.iter().any(|t| t == template) {
            Some(ContainerKind::Vector)
        } else if self.map_templates.iter().any(|t| t == template) {
            Some(ContainerKind::Map)
        } else {
            None
        }
    }
}

impl Default for ContainerRules {
    fn default() -> Self {
        let config = Config::default();
        ContainerRules {
            vector_templates: config.vector_templates,
            map_templates: config.map_templates,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub annotation_prefix: String,
    pub allow_specializations: bool,
    pub ignored_path_prefixes: Vec<String>,
    pub containers: ContainerRules,
}

impl AnalysisOptions {
    /// True when a declaration at `file` lives under an ignored prefix
    pub fn is_ignored_path(&self, file: &str) -> bool {
        self.ignored_path_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && file.starts_with(prefix.as_str()))
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        AnalysisOptions {
            annotation_prefix: DEFAULT_ANNOTATION_PREFIX.to_string(),
            allow_specializations: false,
            ignored_path_prefixes: Vec::new(),
            containers: ContainerRules::default(),
        }
    }
}

impl From<&Config> for AnalysisOptions {
    fn from(config: &Config) -> Self {
        AnalysisOptions {
            annotation_prefix: config.annotation_prefix.clone(),
            allow_specializations: config.allow_specializations,
            ignored_path_prefixes: config.ignored_path_prefixes.clone(),
            containers: ContainerRules {
                vector_templates: config.vector_templates.clone(),
                map_templates: config.map_templates.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_default_templates() {
        let rules = ContainerRules::default();
        assert_eq!(rules.classify("std::vector"), Some(ContainerKind::Vector));
        assert_eq!(rules.classify("::std::unordered_map"), Some(ContainerKind::Map));
        assert_eq!(rules.classify("std::deque"), None);
    }

    #[test]
    fn test_options_follow_config() {
        let mut config = Config::default();
        config.ignored_path_prefixes = vec!["/usr/include".to_string()];
        config.vector_templates.push("eastl::vector".to_string());

        let options = AnalysisOptions::from(&config);
        assert!(options.is_ignored_path("/usr/include/c++/vector"));
        assert!(!options.is_ignored_path("src/game/player.h"));
        assert_eq!(
            options.containers.classify("eastl::vector"),
            Some(ContainerKind::Vector)
        );
    }
}
