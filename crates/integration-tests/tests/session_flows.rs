//! Session and admin authorization flows over in-process fakes.
//!
//! Each "page load" is a fresh `SessionCache` sharing the identity provider,
//! the admin records and the local state file with the previous one.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;
use std::sync::Arc;

use chapter_core::{AuthUser, Email};
use chapter_site::auth::{
    ADMIN_HINT_KEY, AdminDirectory, AdminLoginError, AdminStatus, AuthPhase, FileKeyValue,
    GuardDecision, KeyValueArea, SessionCache,
};
use chapter_site::store::DocumentStore;
use chapter_site::testing::{FakeDocumentStore, FakeIdentityProvider};

const OFFICER: &str = "officer@club.org";
const MEMBER: &str = "member@club.org";
const PASSWORD: &str = "correct horse";

struct Site {
    identity: Arc<FakeIdentityProvider>,
    store: Arc<FakeDocumentStore>,
    state_file: PathBuf,
}

impl Site {
    fn new() -> Self {
        let state_file = std::env::temp_dir().join(format!(
            "chapter-session-{}.json",
            uuid::Uuid::new_v4().simple()
        ));
        Self {
            identity: Arc::new(FakeIdentityProvider::new()),
            store: Arc::new(FakeDocumentStore::new()),
            state_file,
        }
    }

    fn admins(&self) -> AdminDirectory {
        let remote: Arc<dyn DocumentStore> = self.store.clone();
        AdminDirectory::new(Some(remote))
    }

    fn local(&self) -> Arc<FileKeyValue> {
        Arc::new(FileKeyValue::new(self.state_file.clone()))
    }

    fn page_load(&self) -> Arc<SessionCache> {
        Arc::new(SessionCache::new(
            self.identity.clone(),
            self.admins(),
            self.local(),
        ))
    }

    async fn officer_with_admin_record(&self) -> AuthUser {
        let uid = self.identity.add_account(OFFICER, PASSWORD);
        self.admins().grant(&uid).await.unwrap();
        AuthUser {
            uid,
            email: Email::parse(OFFICER).unwrap(),
        }
    }
}

impl Drop for Site {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.state_file);
    }
}

#[tokio::test]
async fn test_admin_hint_survives_reload() {
    let site = Site::new();
    let officer = site.officer_with_admin_record().await;

    let first = site.page_load();
    first.admin_login(OFFICER, PASSWORD).await.unwrap();
    assert_eq!(
        site.local().get(ADMIN_HINT_KEY).as_deref(),
        Some(officer.uid.as_str())
    );

    let second = site.page_load();
    let pending = second.begin(site.identity.current()).unwrap();
    assert_eq!(
        second.state().admin_status(),
        Some(AdminStatus::Optimistic)
    );
    assert!(second.state().is_admin());

    second.settle(pending).await;
    assert_eq!(second.state().admin_status(), Some(AdminStatus::Confirmed));
    assert_eq!(second.guard().decision(), GuardDecision::Allow);
}

#[tokio::test]
async fn test_revoked_admin_is_demoted_after_reload() {
    let site = Site::new();
    let officer = site.officer_with_admin_record().await;
    site.page_load()
        .admin_login(OFFICER, PASSWORD)
        .await
        .unwrap();

    site.admins().revoke(&officer.uid).await.unwrap();

    let reload = site.page_load();
    reload.on_auth_change(site.identity.current()).await;
    let state = reload.state();
    assert_eq!(state.admin_status(), Some(AdminStatus::Denied));
    assert!(!state.is_admin());
    assert_eq!(reload.guard().decision(), GuardDecision::Deny);
}

#[tokio::test]
async fn test_store_outage_fails_closed_despite_hint() {
    let site = Site::new();
    site.officer_with_admin_record().await;
    site.page_load()
        .admin_login(OFFICER, PASSWORD)
        .await
        .unwrap();

    site.store.fail_reads(true);

    let reload = site.page_load();
    reload.on_auth_change(site.identity.current()).await;
    assert!(!reload.state().is_admin());
    assert_eq!(reload.guard().decision(), GuardDecision::Deny);
}

#[tokio::test]
async fn test_non_admin_login_leaves_no_session() {
    let site = Site::new();
    site.identity.add_account(MEMBER, PASSWORD);

    let cache = site.page_load();
    let err = cache.admin_login(MEMBER, PASSWORD).await.unwrap_err();
    assert!(matches!(err, AdminLoginError::NotAdmin));
    assert!(site.identity.current().is_none());
    assert!(cache.state().user().is_none());
    assert_eq!(site.local().get(ADMIN_HINT_KEY), None);
}

#[tokio::test]
async fn test_logout_clears_local_state_when_provider_fails() {
    let site = Site::new();
    site.officer_with_admin_record().await;
    let cache = site.page_load();
    cache.admin_login(OFFICER, PASSWORD).await.unwrap();

    site.identity.fail_sign_out(true);
    cache.logout(true).await;

    assert_eq!(cache.state().phase, AuthPhase::Anonymous);
    assert_eq!(site.local().get(ADMIN_HINT_KEY), None);
}

#[tokio::test]
async fn test_run_loop_follows_sign_in_and_sign_out() {
    let site = Site::new();
    let officer = site.officer_with_admin_record().await;
    let cache = site.page_load();
    let task = cache.clone().run();

    let state = cache.settled().await;
    assert_eq!(state.phase, AuthPhase::Anonymous);
    assert_eq!(cache.guard().decision(), GuardDecision::Deny);

    cache.login(OFFICER, PASSWORD).await.unwrap();
    let mut updates = cache.subscribe();
    let state = updates
        .wait_for(|s| s.admin_status() == Some(AdminStatus::Confirmed))
        .await
        .unwrap()
        .clone();
    assert_eq!(state.user(), Some(&officer));

    cache.logout(false).await;
    let state = updates
        .wait_for(|s| s.phase == AuthPhase::Anonymous)
        .await
        .unwrap()
        .clone();
    assert!(!state.is_admin());

    task.abort();
}
