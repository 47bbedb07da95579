/// Names and wallet addresses that may not post.
///
/// Names match case-insensitively after trimming; wallets must match exactly.
#[derive(Debug, Clone, Default)]
pub struct Blocklist {
    names: Vec<String>,
    wallets: Vec<String>,
}

impl Blocklist {
    pub fn new<N, W>(names: N, wallets: W) -> Self
    where
        N: IntoIterator,
        N::Item: AsRef<str>,
        W: IntoIterator,
        W::Item: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| normalize_name(n.as_ref()))
                .filter(|n| !n.is_empty())
                .collect(),
            wallets: wallets
                .into_iter()
                .map(|w| w.as_ref().trim().to_string())
                .filter(|w| !w.is_empty())
                .collect(),
        }
    }

    /// Build from comma-separated lists, as found in the environment.
    pub fn from_lists(names: &str, wallets: &str) -> Self {
        Self::new(names.split(','), wallets.split(','))
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.wallets.is_empty()
    }

    /// `name` and `wallet` are expected to be trimmed already.
    pub fn is_blocked(&self, name: Option<&str>, wallet: Option<&str>) -> bool {
        if let Some(name) = name {
            let name = normalize_name(name);
            if self.names.iter().any(|blocked| *blocked == name) {
                return true;
            }
        }
        if let Some(wallet) = wallet {
            if self.wallets.iter().any(|blocked| blocked == wallet) {
                return true;
            }
        }
        false
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
