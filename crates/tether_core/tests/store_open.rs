use serde::{Deserialize, Serialize};
use tether_core::store::schema::provision_entity_table;
use tether_core::{open_store, Entity, Repository};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Note {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Text")]
    text: String,
}

impl Entity for Note {
    fn type_name() -> &'static str {
        "Note"
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_id(&mut self, id: String) {
        self.id = id;
    }
}

#[test]
fn file_backed_store_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");

    let id = {
        let conn = open_store(&path).unwrap();
        provision_entity_table(&conn, "Note").unwrap();
        let repo = Repository::new(&conn);
        let mut note = Note {
            text: "persisted".to_string(),
            ..Note::default()
        };
        repo.insert(&mut note).unwrap()
    };

    let conn = open_store(&path).unwrap();
    let repo = Repository::new(&conn);
    let loaded = repo.get_object_state::<Note>(&id).unwrap().unwrap();
    assert_eq!(loaded.text, "persisted");
}

#[test]
fn two_connections_share_one_file_backed_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");

    let writer = open_store(&path).unwrap();
    provision_entity_table(&writer, "Note").unwrap();
    let reader = open_store(&path).unwrap();

    let writer_repo = Repository::new(&writer);
    let reader_repo = Repository::new(&reader);

    let mut note = Note {
        text: "visible".to_string(),
        ..Note::default()
    };
    let id = writer_repo.insert(&mut note).unwrap();

    let loaded = reader_repo.get_object_state::<Note>(&id).unwrap().unwrap();
    assert_eq!(loaded.text, "visible");
}
