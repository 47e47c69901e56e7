// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite persistence backend
//!
//! The whole repository in one database file, bundled SQLite.

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::association::{ClassAssociation, InstanceAssociation};
use crate::error::{CimError, CimResult};
use crate::model::{CimClass, CimInstance, CimName, CimObjectPath, CimQualifierDecl, NamespaceName};
use crate::namespace::NamespaceDefinition;
use crate::store::{instance_path, PersistentStore};
use crate::streamer::{AutoStreamer, Encoding, ObjectStreamer};

/// SQLite persistence store
///
/// Thread-safe via internal Mutex (SQLite Connection is not Sync).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE namespaces (name_key TEXT PRIMARY KEY, definition TEXT NOT NULL);
/// CREATE TABLE qualifiers (ns TEXT, name_key TEXT, body BLOB, PRIMARY KEY (ns, name_key));
/// CREATE TABLE classes (ns TEXT, name_key TEXT, body BLOB, PRIMARY KEY (ns, name_key));
/// CREATE TABLE instances (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     ns TEXT, class_key TEXT, path_key TEXT, body BLOB,
///     UNIQUE (ns, path_key)
/// );
/// CREATE TABLE class_associations (id INTEGER PRIMARY KEY AUTOINCREMENT,
///     ns TEXT, assoc_class_key TEXT, body BLOB);
/// CREATE TABLE instance_associations (id INTEGER PRIMARY KEY AUTOINCREMENT,
///     ns TEXT, assoc_path_key TEXT, from_path_key TEXT, body BLOB);
/// ```
///
/// Keys are lowercased names; `definition` is JSON, bodies use the
/// configured [`Encoding`].
pub struct SqliteStore {
    conn: Mutex<Connection>,
    streamer: AutoStreamer,
}

const NS_TABLES: [&str; 5] = [
    "qualifiers",
    "classes",
    "instances",
    "class_associations",
    "instance_associations",
];

impl SqliteStore {
    /// Create a new SQLite store with a file-based database
    pub fn new(path: impl AsRef<Path>, encoding: Encoding) -> CimResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        let store = Self {
            conn: Mutex::new(conn),
            streamer: AutoStreamer::new(encoding),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub fn new_in_memory() -> CimResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
            streamer: AutoStreamer::default(),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> CimResult<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS namespaces (
                name_key TEXT PRIMARY KEY,
                definition TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS qualifiers (
                ns TEXT NOT NULL,
                name_key TEXT NOT NULL,
                body BLOB NOT NULL,
                PRIMARY KEY (ns, name_key)
            );
            CREATE TABLE IF NOT EXISTS classes (
                ns TEXT NOT NULL,
                name_key TEXT NOT NULL,
                body BLOB NOT NULL,
                PRIMARY KEY (ns, name_key)
            );
            CREATE TABLE IF NOT EXISTS instances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ns TEXT NOT NULL,
                class_key TEXT NOT NULL,
                path_key TEXT NOT NULL,
                body BLOB NOT NULL,
                UNIQUE (ns, path_key)
            );
            CREATE INDEX IF NOT EXISTS idx_instances_class ON instances(ns, class_key);
            CREATE TABLE IF NOT EXISTS class_associations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ns TEXT NOT NULL,
                assoc_class_key TEXT NOT NULL,
                body BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS instance_associations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ns TEXT NOT NULL,
                assoc_path_key TEXT NOT NULL,
                from_path_key TEXT NOT NULL,
                body BLOB NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_instance_assoc_from
                ON instance_associations(ns, from_path_key);",
        )?;
        Ok(())
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CimResult<Vec<u8>> {
        self.streamer.encode(&value)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CimResult<T> {
        self.streamer.decode(bytes)
    }

    fn decode_all<T: DeserializeOwned>(&self, bodies: Vec<Vec<u8>>) -> CimResult<Vec<T>> {
        bodies.iter().map(|b| self.decode(b)).collect()
    }
}

fn require_namespace(conn: &Connection, ns: &NamespaceName) -> CimResult<()> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM namespaces WHERE name_key = ?1",
            [ns.to_key()],
            |row| row.get(0),
        )
        .optional()?;
    match found {
        Some(_) => Ok(()),
        None => Err(CimError::invalid_namespace(ns)),
    }
}

/// Run a single-column BLOB query.
fn query_bodies(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> CimResult<Vec<Vec<u8>>> {
    let mut stmt = conn.prepare(sql)?;
    let bodies = stmt
        .query_map(params, |row| row.get::<_, Vec<u8>>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(bodies)
}

fn insert_class_associations(
    conn: &Connection,
    streamer: &AutoStreamer,
    ns_key: &str,
    associations: &[ClassAssociation],
) -> CimResult<()> {
    for record in associations {
        conn.execute(
            "INSERT INTO class_associations (ns, assoc_class_key, body) VALUES (?1, ?2, ?3)",
            params![ns_key, record.assoc_class_name.to_key(), streamer.encode(record)?],
        )?;
    }
    Ok(())
}

impl PersistentStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn enumerate_namespaces(&self) -> CimResult<Vec<NamespaceDefinition>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT definition FROM namespaces ORDER BY name_key")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        rows.iter()
            .map(|json| serde_json::from_str(json).map_err(CimError::from))
            .collect()
    }

    fn create_namespace(&self, def: &NamespaceDefinition) -> CimResult<()> {
        let conn = self.conn.lock();
        if require_namespace(&conn, &def.name).is_ok() {
            return Err(CimError::already_exists(format!("namespace {}", def.name)));
        }
        conn.execute(
            "INSERT INTO namespaces (name_key, definition) VALUES (?1, ?2)",
            params![def.name.to_key(), serde_json::to_string(def)?],
        )?;
        Ok(())
    }

    fn update_namespace(&self, def: &NamespaceDefinition) -> CimResult<()> {
        let conn = self.conn.lock();
        require_namespace(&conn, &def.name)?;
        conn.execute(
            "UPDATE namespaces SET definition = ?2 WHERE name_key = ?1",
            params![def.name.to_key(), serde_json::to_string(def)?],
        )?;
        Ok(())
    }

    fn rename_namespace(&self, old: &NamespaceName, new: &NamespaceName) -> CimResult<()> {
        let mut conn = self.conn.lock();
        require_namespace(&conn, old)?;
        if require_namespace(&conn, new).is_ok() {
            return Err(CimError::already_exists(format!("namespace {}", new)));
        }

        let json: String = conn.query_row(
            "SELECT definition FROM namespaces WHERE name_key = ?1",
            [old.to_key()],
            |row| row.get(0),
        )?;
        let mut def: NamespaceDefinition = serde_json::from_str(&json)?;
        def.name = new.clone();

        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE namespaces SET name_key = ?2, definition = ?3 WHERE name_key = ?1",
            params![old.to_key(), new.to_key(), serde_json::to_string(&def)?],
        )?;
        for table in NS_TABLES {
            tx.execute(
                &format!("UPDATE {} SET ns = ?2 WHERE ns = ?1", table),
                params![old.to_key(), new.to_key()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_namespace(&self, ns: &NamespaceName) -> CimResult<()> {
        let mut conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let tx = conn.transaction()?;
        for table in NS_TABLES {
            tx.execute(&format!("DELETE FROM {} WHERE ns = ?1", table), [ns.to_key()])?;
        }
        tx.execute("DELETE FROM namespaces WHERE name_key = ?1", [ns.to_key()])?;
        tx.commit()?;
        Ok(())
    }

    fn is_namespace_empty(&self, ns: &NamespaceName) -> CimResult<bool> {
        let conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let count: i64 = conn.query_row(
            "SELECT (SELECT COUNT(*) FROM classes WHERE ns = ?1)
                  + (SELECT COUNT(*) FROM instances WHERE ns = ?1)",
            [ns.to_key()],
            |row| row.get(0),
        )?;
        Ok(count == 0)
    }

    fn enumerate_qualifiers(&self, ns: &NamespaceName) -> CimResult<Vec<CimQualifierDecl>> {
        let conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let bodies = query_bodies(
            &conn,
            "SELECT body FROM qualifiers WHERE ns = ?1 ORDER BY name_key",
            [ns.to_key()],
        )?;
        self.decode_all(bodies)
    }

    fn get_qualifier(
        &self,
        ns: &NamespaceName,
        name: &CimName,
    ) -> CimResult<Option<CimQualifierDecl>> {
        let conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let body: Option<Vec<u8>> = conn
            .query_row(
                "SELECT body FROM qualifiers WHERE ns = ?1 AND name_key = ?2",
                params![ns.to_key(), name.to_key()],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| self.decode(&b)).transpose()
    }

    fn set_qualifier(&self, ns: &NamespaceName, decl: &CimQualifierDecl) -> CimResult<()> {
        let conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        conn.execute(
            "INSERT OR REPLACE INTO qualifiers (ns, name_key, body) VALUES (?1, ?2, ?3)",
            params![ns.to_key(), decl.name().to_key(), self.encode(decl)?],
        )?;
        Ok(())
    }

    fn delete_qualifier(&self, ns: &NamespaceName, name: &CimName) -> CimResult<()> {
        let conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let deleted = conn.execute(
            "DELETE FROM qualifiers WHERE ns = ?1 AND name_key = ?2",
            params![ns.to_key(), name.to_key()],
        )?;
        if deleted == 0 {
            return Err(CimError::not_found(format!(
                "qualifier {} in namespace {}",
                name, ns
            )));
        }
        Ok(())
    }

    fn enumerate_class_names(
        &self,
        ns: &NamespaceName,
    ) -> CimResult<Vec<(CimName, Option<CimName>)>> {
        let bodies = {
            let conn = self.conn.lock();
            require_namespace(&conn, ns)?;
            query_bodies(
                &conn,
                "SELECT body FROM classes WHERE ns = ?1 ORDER BY name_key",
                [ns.to_key()],
            )?
        };
        let classes: Vec<CimClass> = self.decode_all(bodies)?;
        Ok(classes
            .into_iter()
            .map(|c| (c.name().clone(), c.super_class().cloned()))
            .collect())
    }

    fn get_class(&self, ns: &NamespaceName, name: &CimName) -> CimResult<Option<CimClass>> {
        let conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let body: Option<Vec<u8>> = conn
            .query_row(
                "SELECT body FROM classes WHERE ns = ?1 AND name_key = ?2",
                params![ns.to_key(), name.to_key()],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| self.decode(&b)).transpose()
    }

    fn create_class(
        &self,
        ns: &NamespaceName,
        class: &CimClass,
        associations: &[ClassAssociation],
    ) -> CimResult<()> {
        let mut conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO classes (ns, name_key, body) VALUES (?1, ?2, ?3)",
            params![ns.to_key(), class.name().to_key(), self.encode(class)?],
        )?;
        if inserted == 0 {
            return Err(CimError::already_exists(format!(
                "class {} in namespace {}",
                class.name(),
                ns
            )));
        }
        insert_class_associations(&tx, &self.streamer, &ns.to_key(), associations)?;
        tx.commit()?;
        Ok(())
    }

    fn modify_class(
        &self,
        ns: &NamespaceName,
        class: &CimClass,
        associations: &[ClassAssociation],
    ) -> CimResult<()> {
        let mut conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let tx = conn.transaction()?;
        let updated = tx.execute(
            "UPDATE classes SET body = ?3 WHERE ns = ?1 AND name_key = ?2",
            params![ns.to_key(), class.name().to_key(), self.encode(class)?],
        )?;
        if updated == 0 {
            return Err(CimError::not_found(format!(
                "class {} in namespace {}",
                class.name(),
                ns
            )));
        }
        tx.execute(
            "DELETE FROM class_associations WHERE ns = ?1 AND assoc_class_key = ?2",
            params![ns.to_key(), class.name().to_key()],
        )?;
        insert_class_associations(&tx, &self.streamer, &ns.to_key(), associations)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_class(&self, ns: &NamespaceName, name: &CimName) -> CimResult<()> {
        let mut conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let tx = conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM classes WHERE ns = ?1 AND name_key = ?2",
            params![ns.to_key(), name.to_key()],
        )?;
        if deleted == 0 {
            return Err(CimError::not_found(format!(
                "class {} in namespace {}",
                name, ns
            )));
        }
        tx.execute(
            "DELETE FROM class_associations WHERE ns = ?1 AND assoc_class_key = ?2",
            params![ns.to_key(), name.to_key()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn enumerate_class_associations(
        &self,
        ns: &NamespaceName,
    ) -> CimResult<Vec<ClassAssociation>> {
        let bodies = {
            let conn = self.conn.lock();
            require_namespace(&conn, ns)?;
            query_bodies(
                &conn,
                "SELECT body FROM class_associations WHERE ns = ?1 ORDER BY id",
                [ns.to_key()],
            )?
        };
        self.decode_all(bodies)
    }

    fn enumerate_instances_for_class(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<Vec<CimInstance>> {
        let bodies = {
            let conn = self.conn.lock();
            require_namespace(&conn, ns)?;
            query_bodies(
                &conn,
                "SELECT body FROM instances WHERE ns = ?1 AND class_key = ?2 ORDER BY id",
                params![ns.to_key(), class_name.to_key()],
            )?
        };
        self.decode_all(bodies)
    }

    fn get_instance(
        &self,
        ns: &NamespaceName,
        path: &CimObjectPath,
    ) -> CimResult<Option<CimInstance>> {
        let conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let body: Option<Vec<u8>> = conn
            .query_row(
                "SELECT body FROM instances WHERE ns = ?1 AND path_key = ?2",
                params![ns.to_key(), path.key()],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| self.decode(&b)).transpose()
    }

    fn class_has_instances(&self, ns: &NamespaceName, class_name: &CimName) -> CimResult<bool> {
        let conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM instances WHERE ns = ?1 AND class_key = ?2 LIMIT 1",
                params![ns.to_key(), class_name.to_key()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn create_instance(
        &self,
        ns: &NamespaceName,
        instance: &CimInstance,
        associations: &[InstanceAssociation],
    ) -> CimResult<()> {
        let path = instance_path(instance)?;
        let path_key = path.key();
        let mut conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let tx = conn.transaction()?;
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO instances (ns, class_key, path_key, body)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                ns.to_key(),
                path.class_name().to_key(),
                path_key,
                self.encode(instance)?
            ],
        )?;
        if inserted == 0 {
            return Err(CimError::already_exists(format!("instance {}", path)));
        }
        for record in associations {
            tx.execute(
                "INSERT INTO instance_associations (ns, assoc_path_key, from_path_key, body)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    ns.to_key(),
                    record.assoc_instance.key(),
                    record.from_instance.key(),
                    self.encode(record)?
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn modify_instance(&self, ns: &NamespaceName, instance: &CimInstance) -> CimResult<()> {
        let path = instance_path(instance)?;
        let conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let updated = conn.execute(
            "UPDATE instances SET body = ?3 WHERE ns = ?1 AND path_key = ?2",
            params![ns.to_key(), path.key(), self.encode(instance)?],
        )?;
        if updated == 0 {
            return Err(CimError::not_found(format!("instance {}", path)));
        }
        Ok(())
    }

    fn delete_instance(&self, ns: &NamespaceName, path: &CimObjectPath) -> CimResult<()> {
        let mut conn = self.conn.lock();
        require_namespace(&conn, ns)?;
        let tx = conn.transaction()?;
        let deleted = tx.execute(
            "DELETE FROM instances WHERE ns = ?1 AND path_key = ?2",
            params![ns.to_key(), path.key()],
        )?;
        if deleted == 0 {
            return Err(CimError::not_found(format!("instance {}", path)));
        }
        tx.execute(
            "DELETE FROM instance_associations WHERE ns = ?1 AND assoc_path_key = ?2",
            params![ns.to_key(), path.key()],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn get_instance_associations(
        &self,
        ns: &NamespaceName,
        from: &CimObjectPath,
    ) -> CimResult<Vec<InstanceAssociation>> {
        let bodies = {
            let conn = self.conn.lock();
            require_namespace(&conn, ns)?;
            query_bodies(
                &conn,
                "SELECT body FROM instance_associations
                 WHERE ns = ?1 AND from_path_key = ?2 ORDER BY id",
                params![ns.to_key(), from.key()],
            )?
        };
        self.decode_all(bodies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CimFlavor, CimScope, CimType, CimValue};

    fn ns(s: &str) -> NamespaceName {
        NamespaceName::new(s).unwrap()
    }

    #[test]
    fn test_sqlite_namespace_lifecycle() {
        let store = SqliteStore::new_in_memory().unwrap();
        let def = NamespaceDefinition::new(ns("root/cimv2")).shareable(true);
        store.create_namespace(&def).unwrap();
        assert!(store.create_namespace(&def).is_err());
        assert_eq!(store.enumerate_namespaces().unwrap(), vec![def]);
        assert!(store.is_namespace_empty(&ns("root/cimv2")).unwrap());

        store
            .rename_namespace(&ns("root/cimv2"), &ns("root/renamed"))
            .unwrap();
        let listed = store.enumerate_namespaces().unwrap();
        assert_eq!(listed[0].name, ns("root/renamed"));
        assert!(listed[0].shareable);

        store.delete_namespace(&ns("root/renamed")).unwrap();
        assert!(store.enumerate_namespaces().unwrap().is_empty());
    }

    #[test]
    fn test_sqlite_qualifiers_follow_rename() {
        let store = SqliteStore::new_in_memory().unwrap();
        let old = ns("old");
        store
            .create_namespace(&NamespaceDefinition::new(old.clone()))
            .unwrap();
        let decl = CimQualifierDecl::new(
            "Description",
            CimValue::null(CimType::String),
            CimScope::ANY,
            CimFlavor::TRANSLATABLE,
        );
        store.set_qualifier(&old, &decl).unwrap();

        store.rename_namespace(&old, &ns("new")).unwrap();
        let found = store
            .get_qualifier(&ns("new"), &CimName::new("description"))
            .unwrap()
            .unwrap();
        assert!(found.identical(&decl));

        let err = store.get_qualifier(&old, decl.name()).unwrap_err();
        assert!(err.is(crate::error::CimStatusCode::InvalidNamespace));
    }

    #[test]
    fn test_sqlite_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("repository.db");
        {
            let store = SqliteStore::new(&db, Encoding::Json).unwrap();
            store
                .create_namespace(&NamespaceDefinition::new(ns("root")))
                .unwrap();
            store
                .create_class(&ns("root"), &CimClass::new("TST_A"), &[])
                .unwrap();
        }

        let store = SqliteStore::new(&db, Encoding::Binary).unwrap();
        let names = store.enumerate_class_names(&ns("root")).unwrap();
        assert_eq!(names, vec![(CimName::new("TST_A"), None)]);
        assert!(!store.is_namespace_empty(&ns("root")).unwrap());
    }
}
