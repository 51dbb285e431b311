//! Integration tests for role assignment.
//! Authorization gates, full-replacement semantics, and the bootstrap path.

use async_trait::async_trait;
use claims_gateway::identity::{
    AuthDirectory, CallerContext, Claims, DirectoryError, Identity, InMemoryDirectory, RoleError,
    RoleFlag, RoleGateway, RoleOperation, RoleOutcome,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const BOOTSTRAP: &str = "owner@example.com";

fn caller(uid: &str, email: &str, claims: Claims) -> CallerContext {
    CallerContext {
        uid: uid.into(),
        email: Some(email.into()),
        claims,
    }
}

fn admin() -> CallerContext {
    caller("admin", "admin@example.com", Claims::new().with(RoleFlag::Admin, true))
}

fn setup(users: &[(&str, &str, Claims)]) -> (Arc<InMemoryDirectory>, RoleGateway) {
    let dir = Arc::new(InMemoryDirectory::new());
    for (uid, email, claims) in users {
        dir.insert(Identity {
            uid: (*uid).into(),
            email: Some((*email).into()),
            claims: claims.clone(),
        });
    }
    let gateway = RoleGateway::new(dir.clone(), Some(BOOTSTRAP.into()));
    (dir, gateway)
}

/// Directory whose writes always fail; counts calls.
#[derive(Default)]
struct FailingWrites {
    lookups: AtomicUsize,
    writes: AtomicUsize,
}

#[async_trait]
impl AuthDirectory for FailingWrites {
    fn name(&self) -> &str {
        "failing"
    }

    async fn lookup_by_email(&self, email: &str) -> Result<Identity, DirectoryError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(Identity {
            uid: "u-1".into(),
            email: Some(email.into()),
            claims: Claims::new(),
        })
    }

    async fn replace_claims(&self, _uid: &str, _claims: &Claims) -> Result<(), DirectoryError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(DirectoryError::Provider {
            status: 503,
            message: "UNAVAILABLE".into(),
        })
    }
}

/// Non-admin callers never reach the directory on the admin-gated operations.
#[tokio::test]
async fn non_admin_is_denied_without_directory_call() {
    let (dir, gateway) = setup(&[("u1", "a@x.com", Claims::new())]);
    let author = caller("w", "w@example.com", Claims::new().with(RoleFlag::Author, true));
    let demoted = caller("d", "d@example.com", Claims::new().with(RoleFlag::Admin, false));

    for op in RoleOperation::ALL
        .into_iter()
        .filter(|op| *op != RoleOperation::RestoreBootstrapAdmin)
    {
        for who in [&author, &demoted] {
            let err = gateway.execute(op, Some(who), Some("a@x.com")).await.unwrap_err();
            assert!(matches!(err, RoleError::PermissionDenied), "{op}: {err:?}");
        }
    }
    assert_eq!(dir.calls(), 0);
    assert!(dir.writes().is_empty());
}

#[tokio::test]
async fn anonymous_caller_is_unauthenticated() {
    let (dir, gateway) = setup(&[("u1", "a@x.com", Claims::new())]);
    for op in RoleOperation::ALL {
        let err = gateway.execute(op, None, Some("a@x.com")).await.unwrap_err();
        assert_eq!(err.code(), "unauthenticated", "{op}");
    }
    assert_eq!(dir.calls(), 0);
}

#[tokio::test]
async fn unknown_target_yields_error_and_no_write() {
    let (dir, gateway) = setup(&[]);
    let admin = admin();
    for op in RoleOperation::ALL
        .into_iter()
        .filter(|op| *op != RoleOperation::RestoreBootstrapAdmin)
    {
        let err = gateway.execute(op, Some(&admin), Some("ghost@x.com")).await.unwrap_err();
        assert!(matches!(err, RoleError::UserNotFound(ref e) if e == "ghost@x.com"));
    }
    assert!(dir.writes().is_empty());
}

#[tokio::test]
async fn bootstrap_restore_for_missing_account_is_not_found() {
    let (dir, gateway) = setup(&[]);
    let owner = caller("owner", BOOTSTRAP, Claims::new());
    let err = gateway.restore_bootstrap_admin(Some(&owner)).await.unwrap_err();
    assert_eq!(err.code(), "user-not-found");
    assert!(dir.writes().is_empty());
}

#[tokio::test]
async fn grant_then_revoke_admin_drops_other_flags() {
    let (dir, gateway) = setup(&[(
        "u1",
        "a@x.com",
        Claims::new().with(RoleFlag::Author, true).with(RoleFlag::Guest, true),
    )]);
    let admin = admin();

    gateway.grant_admin(Some(&admin), "a@x.com").await.unwrap();
    assert_eq!(dir.get("u1").unwrap().claims, Claims::new().with(RoleFlag::Admin, true));

    gateway.revoke_admin(Some(&admin), "a@x.com").await.unwrap();
    let (uid, last) = dir.last_write().unwrap();
    assert_eq!(uid, "u1");
    assert_eq!(last, Claims::new().with(RoleFlag::Admin, false));
    assert_eq!(last.get(RoleFlag::Author), None);
    assert_eq!(last.get(RoleFlag::Guest), None);
}

#[tokio::test]
async fn reset_to_guest_yields_exact_object() {
    let (dir, gateway) = setup(&[(
        "u1",
        "a@x.com",
        Claims::new().with(RoleFlag::Admin, true).with(RoleFlag::Author, true),
    )]);
    let message = gateway.reset_to_guest(Some(&admin()), "a@x.com").await.unwrap();
    assert_eq!(message, "User is now a guest");

    let expected = Claims::new()
        .with(RoleFlag::Author, false)
        .with(RoleFlag::Admin, false)
        .with(RoleFlag::Guest, true);
    assert_eq!(dir.get("u1").unwrap().claims, expected);
    assert_eq!(
        dir.get("u1").unwrap().claims.to_attributes().unwrap(),
        r#"{"admin":false,"author":false,"invitado":true}"#
    );
}

/// `{email: "a@x.com"}` + admin caller → replaceClaims(idOf(a@x.com), {author: true}).
#[tokio::test]
async fn grant_author_scenario() {
    let (dir, gateway) = setup(&[
        ("uid-a", "a@x.com", Claims::new()),
        ("uid-b", "b@x.com", Claims::new()),
    ]);
    let outcome = gateway
        .invoke(RoleOperation::GrantAuthor, Some(&admin()), Some("a@x.com"))
        .await;

    assert_eq!(
        outcome,
        RoleOutcome::Success {
            message: "User is now an author".into()
        }
    );
    assert_eq!(
        dir.writes(),
        vec![("uid-a".to_string(), Claims::new().with(RoleFlag::Author, true))]
    );
}

#[tokio::test]
async fn every_operation_reports_its_own_message() {
    let (_dir, gateway) = setup(&[("u1", "a@x.com", Claims::new())]);
    let admin = admin();
    let expected = [
        (RoleOperation::GrantAdmin, "Admin role granted"),
        (RoleOperation::RevokeAdmin, "User is no longer an admin"),
        (RoleOperation::GrantAuthor, "User is now an author"),
        (RoleOperation::RevokeAuthor, "User is no longer an author"),
        (RoleOperation::ResetToGuest, "User is now a guest"),
    ];
    for (op, message) in expected {
        assert_eq!(gateway.execute(op, Some(&admin), Some("a@x.com")).await.unwrap(), message);
    }
}

#[tokio::test]
async fn failed_write_becomes_claims_update_error() {
    let dir = Arc::new(FailingWrites::default());
    let gateway = RoleGateway::new(dir.clone(), None);

    let outcome = gateway
        .invoke(RoleOperation::GrantAdmin, Some(&admin()), Some("a@x.com"))
        .await;
    match outcome {
        RoleOutcome::Failure { error } => {
            assert_eq!(error.code, "claims-update-failed");
            assert!(error.message.contains("UNAVAILABLE"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(dir.lookups.load(Ordering::SeqCst), 1);
    assert_eq!(dir.writes.load(Ordering::SeqCst), 1);
}

// ── Bootstrap ──────────────────────────────────────────────────────

#[tokio::test]
async fn bootstrap_refused_for_admin_regardless_of_email() {
    let (dir, gateway) = setup(&[("owner", BOOTSTRAP, Claims::new())]);
    for email in [BOOTSTRAP, "someone@example.com"] {
        let who = caller("x", email, Claims::new().with(RoleFlag::Admin, true));
        let err = gateway.restore_bootstrap_admin(Some(&who)).await.unwrap_err();
        assert!(matches!(err, RoleError::AlreadyAdmin(_)), "{email}: {err:?}");
    }
    assert_eq!(dir.calls(), 0);
}

#[tokio::test]
async fn bootstrap_refused_for_other_accounts() {
    let (dir, gateway) = setup(&[("owner", BOOTSTRAP, Claims::new())]);
    for email in ["intruder@example.com", "OWNER@example.com", " owner@example.com"] {
        let who = caller("x", email, Claims::new());
        let err = gateway.restore_bootstrap_admin(Some(&who)).await.unwrap_err();
        assert_eq!(err.code(), "permission-denied", "{email}");
    }
    let no_email = CallerContext {
        uid: "phone-user".into(),
        email: None,
        claims: Claims::new(),
    };
    assert!(gateway.restore_bootstrap_admin(Some(&no_email)).await.is_err());
    assert_eq!(dir.calls(), 0);
}

#[tokio::test]
async fn bootstrap_promotes_only_the_bootstrap_account() {
    let (dir, gateway) = setup(&[
        ("owner", BOOTSTRAP, Claims::new().with(RoleFlag::Author, true)),
        ("other", "other@example.com", Claims::new()),
    ]);
    let owner = caller("owner", BOOTSTRAP, Claims::new().with(RoleFlag::Author, true));

    // The payload email is ignored.
    let message = gateway
        .execute(RoleOperation::RestoreBootstrapAdmin, Some(&owner), Some("other@example.com"))
        .await
        .unwrap();
    assert!(message.contains(BOOTSTRAP));

    assert_eq!(
        dir.writes(),
        vec![("owner".to_string(), Claims::new().with(RoleFlag::Admin, true))]
    );
    assert!(dir.get("other").unwrap().claims.is_empty());
}

#[tokio::test]
async fn bootstrap_without_configuration_fails() {
    let dir = Arc::new(InMemoryDirectory::new());
    let gateway = RoleGateway::new(dir.clone(), None);
    let who = caller("owner", BOOTSTRAP, Claims::new());
    let err = gateway.restore_bootstrap_admin(Some(&who)).await.unwrap_err();
    assert!(matches!(err, RoleError::BootstrapNotConfigured));
    assert_eq!(dir.calls(), 0);
}
