// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Directory-tree persistence backend.
//!
//! Layout under the repository root:
//!
//! ```text
//! root#cimv2/                 namespace name, '/' encoded as '#'
//!   namespace.json            NamespaceDefinition (always JSON)
//!   qualifiers/<name>         CimQualifierDecl body
//!   classes/<class>           CimClass body
//!   instances/<class>         every instance of the class, creation order
//!   associations/classes      ClassAssociation table
//!   associations/instances    InstanceAssociation table
//! ```
//!
//! File names are lowercased identifiers. Bodies use the configured
//! [`Encoding`]; either encoding is accepted on read. Every write goes to
//! a temporary file that is then renamed over the target.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::association::{ClassAssociation, InstanceAssociation};
use crate::error::{CimError, CimResult};
use crate::model::{CimClass, CimInstance, CimName, CimObjectPath, CimQualifierDecl, NamespaceName};
use crate::namespace::NamespaceDefinition;
use crate::store::{instance_path, PersistentStore};
use crate::streamer::{AutoStreamer, Encoding, ObjectStreamer};

const NAMESPACE_FILE: &str = "namespace.json";
const QUALIFIERS_DIR: &str = "qualifiers";
const CLASSES_DIR: &str = "classes";
const INSTANCES_DIR: &str = "instances";
const ASSOCIATIONS_DIR: &str = "associations";
const CLASS_ASSOC_FILE: &str = "classes";
const INSTANCE_ASSOC_FILE: &str = "instances";
const TMP_SUFFIX: &str = "tmp";

// ---------------------------------------------------------------------------
// FileStore
// ---------------------------------------------------------------------------

pub struct FileStore {
    root: PathBuf,
    streamer: AutoStreamer,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>, encoding: Encoding) -> CimResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            streamer: AutoStreamer::new(encoding),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ns_dir(&self, ns: &NamespaceName) -> PathBuf {
        self.root.join(ns.to_file_name())
    }

    fn existing_ns_dir(&self, ns: &NamespaceName) -> CimResult<PathBuf> {
        let dir = self.ns_dir(ns);
        if dir.join(NAMESPACE_FILE).is_file() {
            Ok(dir)
        } else {
            Err(CimError::invalid_namespace(ns))
        }
    }

    fn qualifier_file(&self, ns: &NamespaceName, name: &CimName) -> CimResult<PathBuf> {
        Ok(self
            .existing_ns_dir(ns)?
            .join(QUALIFIERS_DIR)
            .join(file_key(name)?))
    }

    fn class_file(&self, ns: &NamespaceName, name: &CimName) -> CimResult<PathBuf> {
        Ok(self.existing_ns_dir(ns)?.join(CLASSES_DIR).join(file_key(name)?))
    }

    fn instance_file(&self, ns: &NamespaceName, class_name: &CimName) -> CimResult<PathBuf> {
        Ok(self
            .existing_ns_dir(ns)?
            .join(INSTANCES_DIR)
            .join(file_key(class_name)?))
    }

    fn class_assoc_file(&self, ns: &NamespaceName) -> CimResult<PathBuf> {
        Ok(self
            .existing_ns_dir(ns)?
            .join(ASSOCIATIONS_DIR)
            .join(CLASS_ASSOC_FILE))
    }

    fn instance_assoc_file(&self, ns: &NamespaceName) -> CimResult<PathBuf> {
        Ok(self
            .existing_ns_dir(ns)?
            .join(ASSOCIATIONS_DIR)
            .join(INSTANCE_ASSOC_FILE))
    }

    fn read_body<T: DeserializeOwned>(&self, path: &Path) -> CimResult<Option<T>> {
        match fs::read(path) {
            Ok(bytes) => self
                .streamer
                .decode(&bytes)
                .map(Some)
                .map_err(|e| CimError::Corrupt(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_body<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> CimResult<()> {
        let bytes = self.streamer.encode(&value)?;
        write_atomic(path, &bytes)
    }

    /// Decode every body in `dir`, ordered by file name.
    fn read_dir_bodies<T: DeserializeOwned>(&self, dir: &Path) -> CimResult<Vec<T>> {
        let mut out = Vec::new();
        for path in list_files(dir)? {
            if let Some(body) = self.read_body(&path)? {
                out.push(body);
            }
        }
        Ok(out)
    }

    fn load_instances(&self, ns: &NamespaceName, class_name: &CimName) -> CimResult<Vec<CimInstance>> {
        Ok(self
            .read_body(&self.instance_file(ns, class_name)?)?
            .unwrap_or_default())
    }

    fn save_instances(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
        instances: &[CimInstance],
    ) -> CimResult<()> {
        let path = self.instance_file(ns, class_name)?;
        if instances.is_empty() {
            remove_if_exists(&path)
        } else {
            self.write_body(&path, instances)
        }
    }

    fn load_class_associations(&self, ns: &NamespaceName) -> CimResult<Vec<ClassAssociation>> {
        Ok(self
            .read_body(&self.class_assoc_file(ns)?)?
            .unwrap_or_default())
    }

    fn save_class_associations(
        &self,
        ns: &NamespaceName,
        records: &[ClassAssociation],
    ) -> CimResult<()> {
        self.write_body(&self.class_assoc_file(ns)?, records)
    }

    fn load_instance_associations(&self, ns: &NamespaceName) -> CimResult<Vec<InstanceAssociation>> {
        Ok(self
            .read_body(&self.instance_assoc_file(ns)?)?
            .unwrap_or_default())
    }

    fn save_instance_associations(
        &self,
        ns: &NamespaceName,
        records: &[InstanceAssociation],
    ) -> CimResult<()> {
        self.write_body(&self.instance_assoc_file(ns)?, records)
    }

    fn write_definition(&self, dir: &Path, def: &NamespaceDefinition) -> CimResult<()> {
        let json = serde_json::to_string_pretty(def)?;
        write_atomic(&dir.join(NAMESPACE_FILE), json.as_bytes())
    }
}

impl PersistentStore for FileStore {
    fn backend_name(&self) -> &'static str {
        "file"
    }

    fn enumerate_namespaces(&self) -> CimResult<Vec<NamespaceDefinition>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            let def_file = path.join(NAMESPACE_FILE);
            if !path.is_dir() || !def_file.is_file() {
                continue;
            }
            let json = fs::read_to_string(&def_file)?;
            let def: NamespaceDefinition = serde_json::from_str(&json)
                .map_err(|e| CimError::Corrupt(format!("{}: {}", def_file.display(), e)))?;
            out.push(def);
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn create_namespace(&self, def: &NamespaceDefinition) -> CimResult<()> {
        let dir = self.ns_dir(&def.name);
        if dir.exists() {
            return Err(CimError::already_exists(format!("namespace {}", def.name)));
        }
        for sub in [QUALIFIERS_DIR, CLASSES_DIR, INSTANCES_DIR, ASSOCIATIONS_DIR] {
            fs::create_dir_all(dir.join(sub))?;
        }
        self.write_definition(&dir, def)
    }

    fn update_namespace(&self, def: &NamespaceDefinition) -> CimResult<()> {
        let dir = self.existing_ns_dir(&def.name)?;
        self.write_definition(&dir, def)
    }

    fn rename_namespace(&self, old: &NamespaceName, new: &NamespaceName) -> CimResult<()> {
        let old_dir = self.existing_ns_dir(old)?;
        let new_dir = self.ns_dir(new);
        if new_dir.exists() {
            return Err(CimError::already_exists(format!("namespace {}", new)));
        }
        let json = fs::read_to_string(old_dir.join(NAMESPACE_FILE))?;
        let mut def: NamespaceDefinition = serde_json::from_str(&json)?;
        fs::rename(&old_dir, &new_dir)?;
        def.name = new.clone();
        self.write_definition(&new_dir, &def)
    }

    fn delete_namespace(&self, ns: &NamespaceName) -> CimResult<()> {
        let dir = self.existing_ns_dir(ns)?;
        fs::remove_dir_all(dir)?;
        Ok(())
    }

    fn is_namespace_empty(&self, ns: &NamespaceName) -> CimResult<bool> {
        let dir = self.existing_ns_dir(ns)?;
        Ok(list_files(&dir.join(CLASSES_DIR))?.is_empty()
            && list_files(&dir.join(INSTANCES_DIR))?.is_empty())
    }

    fn enumerate_qualifiers(&self, ns: &NamespaceName) -> CimResult<Vec<CimQualifierDecl>> {
        self.read_dir_bodies(&self.existing_ns_dir(ns)?.join(QUALIFIERS_DIR))
    }

    fn get_qualifier(
        &self,
        ns: &NamespaceName,
        name: &CimName,
    ) -> CimResult<Option<CimQualifierDecl>> {
        self.read_body(&self.qualifier_file(ns, name)?)
    }

    fn set_qualifier(&self, ns: &NamespaceName, decl: &CimQualifierDecl) -> CimResult<()> {
        self.write_body(&self.qualifier_file(ns, decl.name())?, decl)
    }

    fn delete_qualifier(&self, ns: &NamespaceName, name: &CimName) -> CimResult<()> {
        let path = self.qualifier_file(ns, name)?;
        if !path.is_file() {
            return Err(CimError::not_found(format!(
                "qualifier {} in namespace {}",
                name, ns
            )));
        }
        fs::remove_file(path)?;
        Ok(())
    }

    fn enumerate_class_names(
        &self,
        ns: &NamespaceName,
    ) -> CimResult<Vec<(CimName, Option<CimName>)>> {
        let classes: Vec<CimClass> =
            self.read_dir_bodies(&self.existing_ns_dir(ns)?.join(CLASSES_DIR))?;
        Ok(classes
            .into_iter()
            .map(|c| (c.name().clone(), c.super_class().cloned()))
            .collect())
    }

    fn get_class(&self, ns: &NamespaceName, name: &CimName) -> CimResult<Option<CimClass>> {
        self.read_body(&self.class_file(ns, name)?)
    }

    fn create_class(
        &self,
        ns: &NamespaceName,
        class: &CimClass,
        associations: &[ClassAssociation],
    ) -> CimResult<()> {
        let path = self.class_file(ns, class.name())?;
        if path.exists() {
            return Err(CimError::already_exists(format!(
                "class {} in namespace {}",
                class.name(),
                ns
            )));
        }
        self.write_body(&path, class)?;

        if !associations.is_empty() {
            let mut records = self.load_class_associations(ns)?;
            records.extend_from_slice(associations);
            self.save_class_associations(ns, &records)?;
        }
        Ok(())
    }

    fn modify_class(
        &self,
        ns: &NamespaceName,
        class: &CimClass,
        associations: &[ClassAssociation],
    ) -> CimResult<()> {
        let path = self.class_file(ns, class.name())?;
        if !path.is_file() {
            return Err(CimError::not_found(format!(
                "class {} in namespace {}",
                class.name(),
                ns
            )));
        }
        self.write_body(&path, class)?;

        let mut records = self.load_class_associations(ns)?;
        let before = records.len();
        records.retain(|r| &r.assoc_class_name != class.name());
        if before != records.len() || !associations.is_empty() {
            records.extend_from_slice(associations);
            self.save_class_associations(ns, &records)?;
        }
        Ok(())
    }

    fn delete_class(&self, ns: &NamespaceName, name: &CimName) -> CimResult<()> {
        let path = self.class_file(ns, name)?;
        if !path.is_file() {
            return Err(CimError::not_found(format!(
                "class {} in namespace {}",
                name, ns
            )));
        }
        fs::remove_file(path)?;

        let mut records = self.load_class_associations(ns)?;
        let before = records.len();
        records.retain(|r| &r.assoc_class_name != name);
        if before != records.len() {
            self.save_class_associations(ns, &records)?;
        }
        Ok(())
    }

    fn enumerate_class_associations(
        &self,
        ns: &NamespaceName,
    ) -> CimResult<Vec<ClassAssociation>> {
        self.load_class_associations(ns)
    }

    fn enumerate_instances_for_class(
        &self,
        ns: &NamespaceName,
        class_name: &CimName,
    ) -> CimResult<Vec<CimInstance>> {
        self.load_instances(ns, class_name)
    }

    fn get_instance(
        &self,
        ns: &NamespaceName,
        path: &CimObjectPath,
    ) -> CimResult<Option<CimInstance>> {
        let key = path.key();
        Ok(self
            .load_instances(ns, path.class_name())?
            .into_iter()
            .find(|i| i.path().map(|p| p.key()) == Some(key.clone())))
    }

    fn class_has_instances(&self, ns: &NamespaceName, class_name: &CimName) -> CimResult<bool> {
        Ok(self.instance_file(ns, class_name)?.is_file())
    }

    fn create_instance(
        &self,
        ns: &NamespaceName,
        instance: &CimInstance,
        associations: &[InstanceAssociation],
    ) -> CimResult<()> {
        let path = instance_path(instance)?;
        let key = path.key();
        let mut instances = self.load_instances(ns, path.class_name())?;
        if instances
            .iter()
            .any(|i| i.path().map(|p| p.key()).as_deref() == Some(key.as_str()))
        {
            return Err(CimError::already_exists(format!("instance {}", path)));
        }
        instances.push(instance.clone());
        self.save_instances(ns, path.class_name(), &instances)?;

        if !associations.is_empty() {
            let mut records = self.load_instance_associations(ns)?;
            records.extend_from_slice(associations);
            self.save_instance_associations(ns, &records)?;
        }
        Ok(())
    }

    fn modify_instance(&self, ns: &NamespaceName, instance: &CimInstance) -> CimResult<()> {
        let path = instance_path(instance)?;
        let key = path.key();
        let mut instances = self.load_instances(ns, path.class_name())?;
        let slot = instances
            .iter_mut()
            .find(|i| i.path().map(|p| p.key()).as_deref() == Some(key.as_str()))
            .ok_or_else(|| CimError::not_found(format!("instance {}", path)))?;
        *slot = instance.clone();
        self.save_instances(ns, path.class_name(), &instances)
    }

    fn delete_instance(&self, ns: &NamespaceName, path: &CimObjectPath) -> CimResult<()> {
        let key = path.key();
        let mut instances = self.load_instances(ns, path.class_name())?;
        let idx = instances
            .iter()
            .position(|i| i.path().map(|p| p.key()).as_deref() == Some(key.as_str()))
            .ok_or_else(|| CimError::not_found(format!("instance {}", path)))?;
        instances.remove(idx);
        self.save_instances(ns, path.class_name(), &instances)?;

        let mut records = self.load_instance_associations(ns)?;
        let before = records.len();
        records.retain(|r| r.assoc_instance.key() != key);
        if before != records.len() {
            self.save_instance_associations(ns, &records)?;
        }
        Ok(())
    }

    fn get_instance_associations(
        &self,
        ns: &NamespaceName,
        from: &CimObjectPath,
    ) -> CimResult<Vec<InstanceAssociation>> {
        let key = from.key();
        Ok(self
            .load_instance_associations(ns)?
            .into_iter()
            .filter(|r| r.from_instance.key() == key)
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// File name for an object; anything but one plain path component is
/// refused so bodies stay inside their namespace directory.
fn file_key(name: &CimName) -> CimResult<String> {
    let key = name.to_key();
    let mut components = Path::new(&key).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == key.as_str() => Ok(key),
        _ => Err(CimError::invalid_parameter(format!(
            "'{}' cannot be used as a file name",
            name
        ))),
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> CimResult<()> {
    let tmp = path.with_extension(TMP_SUFFIX);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn remove_if_exists(path: &Path) -> CimResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Regular files of `dir` sorted by name, skipping leftover temporaries.
/// A missing directory has no files.
fn list_files(dir: &Path) -> CimResult<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_tmp = path.extension().and_then(|e| e.to_str()) == Some(TMP_SUFFIX);
        if path.is_file() && !is_tmp {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CimKeyBinding, CimProperty, CimQualifier, KeyKind};

    fn ns(s: &str) -> NamespaceName {
        NamespaceName::new(s).unwrap()
    }

    #[test]
    fn test_namespace_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), Encoding::Json).unwrap();
        let def = NamespaceDefinition::new(ns("root/cimv2")).shareable(true);
        store.create_namespace(&def).unwrap();

        let ns_dir = dir.path().join("root#cimv2");
        assert!(ns_dir.join(NAMESPACE_FILE).is_file());
        assert!(ns_dir.join(CLASSES_DIR).is_dir());
        assert!(ns_dir.join(ASSOCIATIONS_DIR).is_dir());

        let err = store.create_namespace(&def).unwrap_err();
        assert!(err.is(crate::error::CimStatusCode::AlreadyExists));

        let listed = store.enumerate_namespaces().unwrap();
        assert_eq!(listed, vec![def]);
    }

    #[test]
    fn test_instance_file_holds_class_extent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), Encoding::Binary).unwrap();
        let root = ns("root");
        store
            .create_namespace(&NamespaceDefinition::new(root.clone()))
            .unwrap();
        let class = CimClass::new("TST_Item").with_property(
            CimProperty::new("Id", 0u32).with_qualifier(CimQualifier::new("Key", true)),
        );
        store.create_class(&root, &class, &[]).unwrap();

        for id in [1u32, 2] {
            let mut instance =
                CimInstance::new("TST_Item").with_property(CimProperty::new("Id", id));
            instance.set_path(Some(class.build_path(&instance).unwrap()));
            store.create_instance(&root, &instance, &[]).unwrap();
        }
        assert!(dir.path().join("root/instances/tst_item").is_file());
        assert!(store.class_has_instances(&root, &CimName::new("tst_item")).unwrap());
        assert!(!store.is_namespace_empty(&root).unwrap());

        let path = CimObjectPath::new("TST_Item").with_key(CimKeyBinding::new(
            "id",
            "1",
            KeyKind::Numeric,
        ));
        store.delete_instance(&root, &path).unwrap();
        let remaining = store
            .enumerate_instance_names_for_class(&root, &CimName::new("TST_Item"))
            .unwrap();
        assert_eq!(remaining.len(), 1);

        let last = remaining[0].clone();
        store.delete_instance(&root, &last).unwrap();
        assert!(!dir.path().join("root/instances/tst_item").exists());
        assert!(!store.class_has_instances(&root, &CimName::new("TST_Item")).unwrap());
    }

    #[test]
    fn test_temporaries_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), Encoding::Json).unwrap();
        let root = ns("root");
        store
            .create_namespace(&NamespaceDefinition::new(root.clone()))
            .unwrap();
        fs::write(dir.path().join("root/classes/broken.tmp"), b"partial").unwrap();

        assert!(store.enumerate_class_names(&root).unwrap().is_empty());
        assert!(store.is_namespace_empty(&root).unwrap());
    }

    #[test]
    fn test_unknown_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path(), Encoding::Json).unwrap();
        let err = store.enumerate_qualifiers(&ns("nowhere")).unwrap_err();
        assert!(err.is(crate::error::CimStatusCode::InvalidNamespace));
    }

    #[test]
    fn test_object_names_stay_inside_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("repo"), Encoding::Json).unwrap();
        let root = ns("root");
        store
            .create_namespace(&NamespaceDefinition::new(root.clone()))
            .unwrap();

        for name in ["../../escaped", "a/b", "", ".."] {
            let err = store
                .create_class(&root, &CimClass::new(name), &[])
                .unwrap_err();
            assert!(err.is(crate::error::CimStatusCode::InvalidParameter), "{name:?}");
        }
        let decl = CimQualifierDecl::new(
            "../Key",
            false,
            crate::model::CimScope::PROPERTY,
            crate::model::CimFlavor::empty(),
        );
        assert!(store.set_qualifier(&root, &decl).is_err());

        assert!(!dir.path().join("escaped").exists());
        assert!(!dir.path().join("Key").exists());
        assert!(store.enumerate_class_names(&root).unwrap().is_empty());
        assert!(store.enumerate_qualifiers(&root).unwrap().is_empty());
    }
}
