//! Skill catalog editing through the facade

use std::sync::Arc;

use portfolio_gate::{
    CredentialConfig, KeyValueStore, MemoryStore, NewCustomSkill, PortfolioGate,
    PortfolioGateBuilder, SkillCatalog, SkillCategory,
};

async fn setup_gate(store: Arc<MemoryStore>) -> PortfolioGate<MemoryStore> {
    PortfolioGateBuilder::new()
        .with_store(store)
        .with_credential(CredentialConfig::Plaintext("letmein".to_string()))
        .build()
        .await
        .expect("Failed to build gate")
}

fn certification(name: &str, category: &str) -> NewCustomSkill {
    NewCustomSkill {
        name: name.to_string(),
        icon_url: None,
        certification_url: format!("https://certs.example/{name}"),
        category: category.to_string(),
    }
}

#[tokio::test]
async fn test_edit_requires_admin() {
    let gate = setup_gate(Arc::new(MemoryStore::new())).await;

    let err = gate.edit_catalog().await.unwrap_err();
    assert!(err.is_not_admin());

    // Reading is always allowed, and a fresh store serves the shipped links.
    let catalog = gate.catalog().await.unwrap();
    assert_eq!(catalog.link("mongodb"), Some("https://mongodb.com"));
    assert_eq!(catalog.link("react"), Some("https://reactjs.org"));
}

#[tokio::test]
async fn test_save_and_reload() {
    let store = Arc::new(MemoryStore::new());
    let gate = setup_gate(store.clone()).await;
    assert!(gate.submit("letmein").await.unwrap().is_accepted());

    let mut draft = gate.edit_catalog().await.unwrap();
    draft.set_link("react", "https://react.dev").unwrap();
    let kubernetes = draft
        .add_custom_skill(certification("Kubernetes", "tools & frameworks"))
        .unwrap();
    assert!(kubernetes.starts_with("custom-"));
    draft
        .add_custom_skill(certification("PostgreSQL", "Databases"))
        .unwrap();
    assert!(draft.is_dirty());

    let saved = gate.save_catalog(draft).await.unwrap();
    assert_eq!(saved.custom_skills.len(), 2);
    assert!(store.get("portfolio_skill_catalog").await.unwrap().is_some());

    // A fresh gate on the same store sees the saved catalog.
    let reopened = setup_gate(store).await;
    let catalog = reopened.catalog().await.unwrap();
    assert_eq!(catalog.link("react"), Some("https://react.dev/"));
    let tools: Vec<_> = catalog
        .custom_skills_in(SkillCategory::ToolsAndFrameworks)
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(tools, vec!["Kubernetes"]);

    // Still logged in through the persisted marker.
    assert!(reopened.is_admin());
    let mut draft = reopened.edit_catalog().await.unwrap();
    draft.remove_custom_skill(&kubernetes).unwrap();
    let saved = reopened.save_catalog(draft).await.unwrap();
    assert_eq!(saved.custom_skills.len(), 1);
}

#[tokio::test]
async fn test_cancel_discards_changes() {
    let gate = setup_gate(Arc::new(MemoryStore::new())).await;
    gate.submit("letmein").await.unwrap();

    let mut draft = gate.edit_catalog().await.unwrap();
    draft.set_link("rust", "https://www.rust-lang.org").unwrap();
    let restored = draft.cancel();

    assert_eq!(restored, SkillCatalog::default());
    assert_eq!(restored.link("rust"), None);
    assert_eq!(gate.catalog().await.unwrap().link("rust"), None);
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let gate = setup_gate(Arc::new(MemoryStore::new())).await;
    gate.submit("letmein").await.unwrap();

    let mut draft = gate.edit_catalog().await.unwrap();
    assert!(draft.set_link("react", "react.dev").is_err());
    assert!(
        draft
            .add_custom_skill(NewCustomSkill {
                name: "   ".to_string(),
                ..certification("Blank", "Languages")
            })
            .is_err()
    );
    assert!(
        draft
            .add_custom_skill(certification("Cobol", "Mainframes"))
            .is_err()
    );
    assert!(draft.remove_custom_skill("custom-missing").is_err());
    assert!(!draft.is_dirty());
}

#[tokio::test]
async fn test_logout_blocks_editing() {
    let gate = setup_gate(Arc::new(MemoryStore::new())).await;
    gate.submit("letmein").await.unwrap();
    gate.logout(None).await.unwrap();

    assert!(gate.edit_catalog().await.unwrap_err().is_not_admin());
}
