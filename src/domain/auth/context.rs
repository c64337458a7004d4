use crate::domain::{DomainError, DomainResult, VerifiedIdentity};

/// Who is calling, for the lifetime of one request.
///
/// Created empty per request; login or the bearer-token middleware fills
/// it in and downstream consumers read it. There is no global instance.
#[derive(Debug, Clone, Default)]
pub struct SecurityContext {
    authentication: Option<VerifiedIdentity>,
}

impl SecurityContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(identity: VerifiedIdentity) -> Self {
        Self {
            authentication: Some(identity),
        }
    }

    pub fn set_authentication(&mut self, identity: VerifiedIdentity) {
        self.authentication = Some(identity);
    }

    pub fn principal(&self) -> Option<&VerifiedIdentity> {
        self.authentication.as_ref()
    }

    pub fn has_authority(&self, name: &str) -> bool {
        self.principal().is_some_and(|p| p.has_authority(name))
    }

    /// The current principal, or `Unauthorized` for anonymous callers
    pub fn require_principal(&self) -> DomainResult<&VerifiedIdentity> {
        self.principal()
            .ok_or_else(|| DomainError::Unauthorized("Not authenticated".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_context_has_no_principal() {
        let ctx = SecurityContext::anonymous();
        assert!(ctx.principal().is_none());
        assert!(!ctx.has_authority("ADMIN"));
        assert!(matches!(
            ctx.require_principal(),
            Err(DomainError::Unauthorized(_))
        ));
    }

    #[test]
    fn authorities_come_from_the_principal() {
        let mut ctx = SecurityContext::anonymous();
        ctx.set_authentication(VerifiedIdentity::new("alice", vec!["ADMIN".into()]));

        assert!(ctx.has_authority("ADMIN"));
        assert!(!ctx.has_authority("admin"));
        assert_eq!(ctx.require_principal().unwrap().username, "alice");
    }
}
