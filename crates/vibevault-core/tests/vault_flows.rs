//! End-to-end flows through the public `Vault` API

use tempfile::TempDir;
use vibevault_core::{
    Config, LinkQuery, LinkStatus, NewLink, Session, SortField, Vault, VaultError,
};

fn open_vault(temp_dir: &TempDir) -> Vault {
    let config = Config {
        data_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    Vault::open_with_config(config).unwrap()
}

#[test]
fn users_never_see_each_others_data() {
    let temp_dir = TempDir::new().unwrap();
    let vault = open_vault(&temp_dir);
    let (_, ada) = vault.sign_in("ada@example.com").unwrap();
    let (_, bob) = vault.sign_in("bob@example.com").unwrap();

    let tag = vault.tags().create_tag(&ada, "private", None).unwrap();
    let link = vault
        .links()
        .create_link(&ada, NewLink::new("https://a.test").with_tags(vec![tag.id]))
        .unwrap();
    let collection = vault.collections().create_collection(&ada, "Mine").unwrap();

    assert!(vault.tags().list_tags(&bob).unwrap().is_empty());
    assert!(vault.collections().list_collections(&bob).unwrap().is_empty());
    assert_eq!(
        vault
            .links()
            .list_links(&bob, &LinkQuery::default())
            .unwrap()
            .total,
        0
    );
    assert!(vault.links().get_link(&bob, link.id).unwrap().is_none());
    assert!(matches!(
        vault.links().add_tag_to_link(&bob, link.id, tag.id),
        Err(VaultError::NotFound { .. })
    ));
    assert!(matches!(
        vault.collections().rename_collection(&bob, collection.id, "Theirs"),
        Err(VaultError::NotFound { .. })
    ));

    // Bob can save the same URL
    vault
        .links()
        .create_link(&bob, NewLink::new("https://a.test"))
        .unwrap();
    assert_eq!(vault.stats(&ada).unwrap().links, 1);
}

#[test]
fn deleting_a_tag_detaches_it_everywhere() {
    let temp_dir = TempDir::new().unwrap();
    let vault = open_vault(&temp_dir);
    let (_, session) = vault.sign_in("ada@example.com").unwrap();

    let tag = vault.tags().create_tag(&session, "rust", None).unwrap();
    for i in 0..3 {
        vault
            .links()
            .create_link(
                &session,
                NewLink::new(format!("https://a.test/{}", i)).with_tags(vec![tag.id]),
            )
            .unwrap();
    }
    assert_eq!(vault.tags().list_tags(&session).unwrap()[0].link_count, 3);

    vault.tags().delete_tag(&session, tag.id).unwrap();

    let by_tag = vault
        .links()
        .list_links(
            &session,
            &LinkQuery {
                tag_id: Some(tag.id),
                ..LinkQuery::default()
            },
        )
        .unwrap();
    assert_eq!(by_tag.total, 0);

    let all = vault
        .links()
        .list_links(&session, &LinkQuery::default())
        .unwrap();
    assert_eq!(all.total, 3);
    assert!(all.items.iter().all(|l| l.tags.is_empty()));
}

#[test]
fn export_then_reimport_is_a_no_op() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("backup.json");
    let mut vault = open_vault(&temp_dir);
    let (_, session) = vault.sign_in("ada@example.com").unwrap();

    let tag = vault.tags().create_tag(&session, "rust", None).unwrap();
    vault.tags().create_tag(&session, "go", None).unwrap();
    for url in ["https://a.test", "https://b.test", "https://c.test"] {
        vault
            .links()
            .create_link(&session, NewLink::new(url).with_tags(vec![tag.id]))
            .unwrap();
    }

    vault.export_to_file(&session, &path).unwrap();
    let report = vault.import_from_file(&session, &path).unwrap();

    assert_eq!(report.imported_links, 0);
    assert_eq!(report.skipped_links, 3);
    assert_eq!(vault.tags().list_tags(&session).unwrap().len(), 2);
    assert_eq!(vault.stats(&session).unwrap().links, 3);
}

#[test]
fn search_then_sort_through_the_vault() {
    let temp_dir = TempDir::new().unwrap();
    let vault = open_vault(&temp_dir);
    let (_, session) = vault.sign_in("ada@example.com").unwrap();

    for (i, title) in ["Rust Book", "Go Guide", "Rust vs Go"].iter().enumerate() {
        vault
            .links()
            .create_link(
                &session,
                NewLink::new(format!("https://a.test/{}", i)).with_title(*title),
            )
            .unwrap();
    }

    let page = vault
        .search(&session, &vault.default_query(), "Rust Go")
        .unwrap();
    assert_eq!(page.items[0].title, "Rust vs Go");

    let by_title = vault
        .search(
            &session,
            &LinkQuery {
                sort: SortField::Title,
                ..vault.default_query()
            },
            "",
        )
        .unwrap();
    let titles: Vec<&str> = by_title.items.iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["Rust vs Go", "Rust Book", "Go Guide"]);
}

#[test]
fn anonymous_session_reads_nothing_and_writes_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let mut vault = open_vault(&temp_dir);
    let anon = Session::anonymous();

    assert!(vault.tags().list_tags(&anon).unwrap().is_empty());
    assert!(vault
        .links()
        .list_links(
            &anon,
            &LinkQuery {
                status: Some(LinkStatus::Inbox),
                ..LinkQuery::default()
            }
        )
        .unwrap()
        .items
        .is_empty());
    assert!(matches!(
        vault.links().create_link(&anon, NewLink::new("https://a.test")),
        Err(VaultError::Unauthenticated)
    ));
    assert!(matches!(
        vault.transfer().export_data(&anon),
        Err(VaultError::Unauthenticated)
    ));
}
