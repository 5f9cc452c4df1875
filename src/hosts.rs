//! Flattened host index and multi-term search.

use regex::Regex;

use crate::config::Config;

/// A host flattened out of its group for searching.
#[derive(Debug, Clone)]
pub struct SearchableHost {
    pub alias: String,
    pub hostname: String,
    pub group_name: String,
    /// Lowercased bag of group name, alias, hostname, and all tags.
    pub search_index: String,
}

/// Flatten every group into searchable hosts.
#[must_use]
pub fn build_index(cfg: &Config) -> Vec<SearchableHost> {
    let mut hosts = Vec::new();
    for group in &cfg.groups {
        for host in &group.hosts {
            let mut keywords = vec![
                group.name.clone(),
                host.alias.clone(),
                host.hostname.clone(),
            ];
            keywords.extend(group.tags.iter().cloned());
            keywords.extend(host.tags.iter().cloned());
            let search_index = keywords
                .iter()
                .map(|w| w.to_lowercase())
                .collect::<Vec<_>>()
                .join(" ");
            hosts.push(SearchableHost {
                alias: host.alias.clone(),
                hostname: host.hostname.clone(),
                group_name: group.name.clone(),
                search_index,
            });
        }
    }
    hosts
}

/// A search term: literal substring, upgraded to a case-insensitive regex
/// when it contains regex metacharacters and compiles.
enum Term {
    Literal(String),
    Pattern(Regex),
}

impl Term {
    fn parse(raw: &str) -> Self {
        if raw.contains(['[', ']', '*', '?', '^', '$', '|']) {
            if let Ok(re) = Regex::new(&format!("(?i){raw}")) {
                return Self::Pattern(re);
            }
        }
        Self::Literal(raw.to_lowercase())
    }

    fn matches(&self, target: &str) -> bool {
        match self {
            Self::Literal(lit) => target.contains(lit),
            Self::Pattern(re) => re.is_match(target),
        }
    }
}

/// Return every host matching ALL terms (logical AND) against its search
/// index.
#[must_use]
pub fn find_hosts<'a>(terms: &[String], hosts: &'a [SearchableHost]) -> Vec<&'a SearchableHost> {
    let parsed: Vec<Term> = terms.iter().map(|t| Term::parse(t)).collect();
    hosts
        .iter()
        .filter(|host| {
            let target = host.search_index.to_lowercase();
            parsed.iter().all(|term| term.matches(&target))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::config::{Group, Host};

    use super::*;

    fn sample() -> Vec<SearchableHost> {
        let cfg = Config {
            groups: vec![
                Group {
                    name: "development".into(),
                    tags: vec!["us-west".into(), "sandbox".into()],
                    hosts: vec![Host {
                        alias: "web-dev-01".into(),
                        hostname: "web-01.dev.example.com".into(),
                        tags: vec!["web".into()],
                    }],
                },
                Group {
                    name: "production".into(),
                    tags: vec!["us-east".into()],
                    hosts: vec![Host {
                        alias: "db-prod-01".into(),
                        hostname: "db-01.prod.example.com".into(),
                        tags: vec!["db".into()],
                    }],
                },
            ],
            ..Config::default()
        };
        build_index(&cfg)
    }

    #[test]
    fn index_includes_group_alias_hostname_and_tags() {
        let hosts = sample();
        assert_eq!(hosts.len(), 2);
        let idx = &hosts[0].search_index;
        for word in ["development", "web-dev-01", "us-west", "sandbox", "web"] {
            assert!(idx.contains(word), "missing {word} in {idx}");
        }
    }

    #[test]
    fn all_terms_must_match() {
        let hosts = sample();
        let found = find_hosts(&["dev".into(), "web".into()], &hosts);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].alias, "web-dev-01");

        assert!(find_hosts(&["dev".into(), "db".into()], &hosts).is_empty());
    }

    #[test]
    fn search_is_case_insensitive() {
        let hosts = sample();
        assert_eq!(find_hosts(&["PROD".into()], &hosts).len(), 1);
    }

    #[test]
    fn regex_terms_are_supported() {
        let hosts = sample();
        let found = find_hosts(&["^dev|^prod".into()], &hosts);
        assert_eq!(found.len(), 2);

        let found = find_hosts(&["db-prod-0[15]".into()], &hosts);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].alias, "db-prod-01");
    }

    #[test]
    fn invalid_regex_falls_back_to_literal() {
        let hosts = sample();
        // Unbalanced bracket cannot compile; treated as a literal that
        // matches nothing here.
        assert!(find_hosts(&["dev[".into()], &hosts).is_empty());
    }
}
