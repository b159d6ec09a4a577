//! Environment Snapshot
//!
//! Captured once at context construction; never re-consults the process
//! environment afterwards. This is what makes evaluation deterministic.

use std::collections::HashMap;

/// Variable name prefixes/names blocked from the snapshot by default
/// because they are volatile and would destabilize plans between runs.
pub const DEFAULT_BLOCKED_NAMES: &[&str] = &["PWD", "OLDPWD", "SHLVL", "RANDOM"];
pub const DEFAULT_BLOCKED_PREFIXES: &[&str] = &["PS"];

/// An immutable mapping from variable name to string, captured once.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    values: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Build a snapshot from an arbitrary source map, applying the given
    /// block-list. `TERM` is always blocked in addition to the caller's
    /// list, since it is volatile across environments and never something
    /// a workflow should branch on.
    pub fn capture(
        source: impl IntoIterator<Item = (String, String)>,
        blocked_names: &[String],
        blocked_prefixes: &[String],
    ) -> Self {
        let mut values = HashMap::new();
        for (key, value) in source {
            if key == "TERM" {
                continue;
            }
            if DEFAULT_BLOCKED_NAMES.contains(&key.as_str()) || blocked_names.iter().any(|b| b == &key) {
                continue;
            }
            if DEFAULT_BLOCKED_PREFIXES
                .iter()
                .any(|p| key.starts_with(p))
                || blocked_prefixes.iter().any(|p| key.starts_with(p.as_str()))
            {
                continue;
            }
            values.insert(key, value);
        }
        Self { values }
    }

    /// Capture from the host process environment, for the local transport
    /// path. Remote transports build their snapshot from the remote
    /// target's environment instead.
    pub fn capture_from_process() -> Self {
        Self::capture(std::env::vars(), &[], &[])
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn src(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn blocks_default_volatile_names() {
        let snap = EnvSnapshot::capture(
            src(&[("PWD", "/tmp"), ("SHLVL", "1"), ("HOME", "/home/user")]),
            &[],
            &[],
        );
        assert_eq!(snap.get("PWD"), None);
        assert_eq!(snap.get("SHLVL"), None);
        assert_eq!(snap.get("HOME"), Some("/home/user"));
    }

    #[test]
    fn blocks_ps_prefix_and_term() {
        let snap = EnvSnapshot::capture(
            src(&[("PS1", "$ "), ("PS2", "> "), ("TERM", "xterm"), ("PATH", "/bin")]),
            &[],
            &[],
        );
        assert_eq!(snap.get("PS1"), None);
        assert_eq!(snap.get("PS2"), None);
        assert_eq!(snap.get("TERM"), None);
        assert_eq!(snap.get("PATH"), Some("/bin"));
    }

    #[test]
    fn custom_block_list_is_additive() {
        let snap = EnvSnapshot::capture(
            src(&[("SECRET", "x"), ("PATH", "/bin")]),
            &["SECRET".to_string()],
            &[],
        );
        assert_eq!(snap.get("SECRET"), None);
        assert_eq!(snap.get("PATH"), Some("/bin"));
    }
}
