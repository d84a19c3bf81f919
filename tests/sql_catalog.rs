#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use telefs::catalog::{Catalog, SqlCatalog};
    use telefs::db::Database;
    use telefs::registry::SqlRegistry;
    use telefs::store::LocalStore;
    use telefs::*;
    use tempfile::TempDir;

    fn new_record(name: &str) -> NewRecord {
        NewRecord {
            parent: ROOT_INODE,
            name: name.to_string(),
            tag: Tag::from_name(name),
            mode: 0o100_600,
            uid: 501,
            gid: 20,
        }
    }

    fn catalog() -> SqlCatalog {
        SqlCatalog::new(Database::open_in_memory().expect("Failed to open database"))
    }

    #[tokio::test]
    async fn test_create_and_lookup() {
        let catalog = catalog();
        let created = catalog.create(new_record("a_1.txt")).await.expect("Failed to create row");
        assert!(created.inode.0 > ROOT_INODE.0);

        let found = catalog.lookup(ROOT_INODE, "a_1.txt").await.expect("Failed to look up row");
        assert_eq!(found.inode, created.inode);
        assert_eq!(found.tag, Tag::new("a"));
        assert_eq!(found.uid, 501);
        assert_eq!(found.gid, 20);
        assert_eq!(found.mode, 0o100_600);
        assert_eq!(found.size, 0);
        assert!(found.content_id.is_none());
        assert_eq!(found.created_at, created.created_at);
    }

    #[tokio::test]
    async fn test_parent_and_name_are_unique() {
        let catalog = catalog();
        catalog.create(new_record("same")).await.unwrap();
        let err = catalog.create(new_record("same")).await.expect_err("duplicate should fail");
        assert!(matches!(err, FsError::AlreadyExists(_)));
        assert_eq!(catalog.list(ROOT_INODE).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_content_returns_previous() {
        let catalog = catalog();
        let record = catalog.create(new_record("doc")).await.unwrap();

        let first = catalog
            .commit_content(record.inode, ContentId::new("c1"), 10)
            .await
            .unwrap();
        assert_eq!(first, None);
        let second = catalog
            .commit_content(record.inode, ContentId::new("c2"), 20)
            .await
            .unwrap();
        assert_eq!(second, Some(ContentId::new("c1")));

        let stored = catalog.get(record.inode).await.unwrap();
        assert_eq!(stored.content_id, Some(ContentId::new("c2")));
        assert_eq!(stored.size, 20);
        assert!(stored.modified_at >= stored.created_at);

        let err = catalog
            .commit_content(Inode(9_999), ContentId::new("c3"), 1)
            .await
            .expect_err("unknown inode should fail");
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_find_by_tag_and_remove() {
        let catalog = catalog();
        let a1 = catalog.create(new_record("a_1")).await.unwrap();
        catalog.create(new_record("a_2")).await.unwrap();
        catalog.create(new_record("b_1")).await.unwrap();

        let tagged: HashSet<String> = catalog
            .find_by_tag(&Tag::new("a"))
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(tagged, HashSet::from(["a_1".to_string(), "a_2".to_string()]));

        let removed = catalog.remove(a1.inode).await.unwrap();
        assert_eq!(removed.name, "a_1");
        assert!(catalog.lookup(ROOT_INODE, "a_1").await.unwrap_err().is_not_found());
        assert!(catalog.remove(a1.inode).await.unwrap_err().is_not_found());

        // The name is free again.
        catalog.create(new_record("a_1")).await.expect("Failed to recreate row");
    }

    #[tokio::test]
    async fn test_rows_survive_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("catalog.db");

        let inode = {
            let catalog = SqlCatalog::new(Database::open(&db_path).unwrap());
            let record = catalog.create(new_record("persisted")).await.unwrap();
            catalog
                .commit_content(record.inode, ContentId::new("kept"), 4)
                .await
                .unwrap();
            record.inode
        };

        let catalog = SqlCatalog::new(Database::open(&db_path).unwrap());
        let record = catalog.lookup(ROOT_INODE, "persisted").await.unwrap();
        assert_eq!(record.inode, inode);
        assert_eq!(record.content_id, Some(ContentId::new("kept")));
        let next = catalog.create(new_record("next")).await.unwrap();
        assert!(next.inode.0 > inode.0);
    }

    #[tokio::test]
    async fn test_filesystem_over_relational_catalog() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db = Database::open(temp_dir.path().join("fs.db")).unwrap();
        let store = LocalStore::new(temp_dir.path().join("objects")).await.unwrap();
        let content = ContentClient::new(Arc::new(store), Arc::new(SqlRegistry::new(db.clone())));
        let fs = FileSystem::new(Arc::new(SqlCatalog::new(db)), content);

        let file = fs
            .root()
            .create(CreateRequest::new("report_q1.csv", 0o100_644, 0, 0))
            .await
            .expect("Failed to create file");
        file.write(b"a,b,c\n1,2,3\n").await.expect("Failed to write file");

        let file = fs.root().lookup("report_q1.csv").await.unwrap();
        assert_eq!(file.read(6, 100).await.unwrap(), b"1,2,3\n".to_vec());
        assert_eq!(file.attr().await.unwrap().size, 12);

        let content_id = file.record().content_id.clone().unwrap();
        fs.root().remove("#report").await.expect("Failed to delete tag group");
        assert!(fs.root().read_dir_all().await.unwrap().is_empty());
        assert!(fs.content().delete(&content_id).await.unwrap_err().is_not_found());
    }
}
