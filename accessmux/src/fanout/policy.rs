//! Per-query classification of shard errors.

use crate::shard::ClientError;

/// What a shard error means for the fan-out it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Disposition {
    /// Abort peers, wrap with the shard description, surface.
    Fatal,
    /// This shard contributes nothing; the fan-out continues.
    Benign,
    /// Abort peers and surface the typed error unchanged.
    Propagate,
}

/// Fan-out error policy: the action phrase used in wrapped error messages
/// and the classifier applied to every shard error.
#[derive(Clone, Copy)]
pub(crate) struct Policy<'a> {
    pub action: &'a str,
    classify: fn(&ClientError) -> Disposition,
}

impl<'a> Policy<'a> {
    /// Default policy: NotFound passes through typed, everything else is
    /// fatal. The empty-group-set signal is always benign; the coordinator
    /// preflights it away, so seeing one means a shard disagreed and its
    /// contribution is simply empty.
    pub fn new(action: &'a str) -> Self {
        Self {
            action,
            classify: default,
        }
    }

    /// NotFound contributes an empty result instead of propagating. Used on
    /// group-layer and reverse-direction fan-outs, where a shard not knowing
    /// a key is expected.
    pub fn benign_not_found(action: &'a str) -> Self {
        Self {
            action,
            classify: benign_not_found,
        }
    }

    pub fn classify(&self, error: &ClientError) -> Disposition {
        (self.classify)(error)
    }
}

fn default(error: &ClientError) -> Disposition {
    if error.is_not_found() {
        Disposition::Propagate
    } else if matches!(error, ClientError::EmptyGroupSet) {
        Disposition::Benign
    } else {
        Disposition::Fatal
    }
}

fn benign_not_found(error: &ClientError) -> Disposition {
    if error.is_not_found() || matches!(error, ClientError::EmptyGroupSet) {
        Disposition::Benign
    } else {
        Disposition::Fatal
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_default_classification() {
        let policy = Policy::new("retrieve users from");

        assert_eq!(
            policy.classify(&ClientError::UserNotFound("user1".into())),
            Disposition::Propagate
        );
        assert_eq!(
            policy.classify(&ClientError::EmptyGroupSet),
            Disposition::Benign
        );
        assert_eq!(
            policy.classify(&ClientError::Rpc("boom".into())),
            Disposition::Fatal
        );
    }

    #[test]
    fn test_benign_not_found() {
        let policy = Policy::benign_not_found("check access via");

        assert_eq!(
            policy.classify(&ClientError::GroupNotFound("group1".into())),
            Disposition::Benign
        );
        assert_eq!(
            policy.classify(&ClientError::Rpc("boom".into())),
            Disposition::Fatal
        );
    }
}
