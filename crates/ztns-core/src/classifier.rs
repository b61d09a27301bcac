//! Connection classifier.
//!
//! Maps the kinds at both ends of a connection to the category of traffic it
//! carries. Called once, when the connection is created.

use serde::{Deserialize, Serialize};

use crate::topology::ComponentKind;

/// Traffic category of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionCategory {
    /// Client authenticating against an identity provider.
    Auth,
    /// Proxy consulting a policy engine.
    Policy,
    /// Everything else.
    Data,
}

impl std::fmt::Display for ConnectionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Auth => "auth",
            Self::Policy => "policy",
            Self::Data => "data",
        };
        f.write_str(name)
    }
}

/// Classify a connection by its endpoint kinds.
///
/// Order-independent: `classify(a, b) == classify(b, a)`.
pub fn classify(a: ComponentKind, b: ComponentKind) -> ConnectionCategory {
    use ComponentKind::{Client, IdentityProvider, PolicyEngine, Proxy};

    match (a, b) {
        (Client, IdentityProvider) | (IdentityProvider, Client) => ConnectionCategory::Auth,
        (Proxy, PolicyEngine) | (PolicyEngine, Proxy) => ConnectionCategory::Policy,
        _ => ConnectionCategory::Data,
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn any_kind() -> impl Strategy<Value = ComponentKind> {
        prop::sample::select(ComponentKind::ALL.to_vec())
    }

    #[test]
    fn client_and_identity_provider_is_auth() {
        assert_eq!(
            classify(ComponentKind::Client, ComponentKind::IdentityProvider),
            ConnectionCategory::Auth
        );
    }

    #[test]
    fn proxy_and_policy_engine_is_policy() {
        assert_eq!(
            classify(ComponentKind::Proxy, ComponentKind::PolicyEngine),
            ConnectionCategory::Policy
        );
    }

    #[test]
    fn other_pairs_are_data() {
        assert_eq!(classify(ComponentKind::Client, ComponentKind::Proxy), ConnectionCategory::Data);
        assert_eq!(
            classify(ComponentKind::Client, ComponentKind::PolicyEngine),
            ConnectionCategory::Data
        );
        assert_eq!(
            classify(ComponentKind::Proxy, ComponentKind::IdentityProvider),
            ConnectionCategory::Data
        );
        assert_eq!(classify(ComponentKind::Client, ComponentKind::Client), ConnectionCategory::Data);
    }

    proptest! {
        #[test]
        fn classify_is_symmetric(a in any_kind(), b in any_kind()) {
            prop_assert_eq!(classify(a, b), classify(b, a));
        }

        #[test]
        fn only_the_two_special_pairs_are_not_data(a in any_kind(), b in any_kind()) {
            let pair = [a, b];
            let is_auth = pair.contains(&ComponentKind::Client)
                && pair.contains(&ComponentKind::IdentityProvider);
            let is_policy = pair.contains(&ComponentKind::Proxy)
                && pair.contains(&ComponentKind::PolicyEngine);

            let expected = if is_auth {
                ConnectionCategory::Auth
            } else if is_policy {
                ConnectionCategory::Policy
            } else {
                ConnectionCategory::Data
            };
            prop_assert_eq!(classify(a, b), expected);
        }
    }
}
