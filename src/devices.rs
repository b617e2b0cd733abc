// src/devices.rs
use crate::error::{StoreError, StoreResult};
use crate::models::{Device, DevicePublicView, DEFAULT_STATUS};
use std::fs;
use std::path::{Path, PathBuf};

/// The device inventory: an ordered collection plus the ID counter.
///
/// IDs are process-lifetime state. They start at 1, only ever grow, and
/// are never taken from a file: importing re-assigns fresh IDs to every
/// incoming record. The default devices file is rewritten in full after
/// every successful mutation.
pub struct DeviceStore {
    devices: Vec<Device>,
    counter: u32,
    filepath: PathBuf,
}

impl DeviceStore {
    /// An empty store bound to its default devices file. The file is not
    /// read here; restoring from disk goes through [`import_from_file`],
    /// which re-assigns IDs.
    ///
    /// [`import_from_file`]: DeviceStore::import_from_file
    pub fn new(filepath: &Path) -> Self {
        DeviceStore {
            devices: Vec::new(),
            counter: 0,
            filepath: filepath.to_path_buf(),
        }
    }

    /// Registers a new device. The saved CPN must be exactly 8
    /// characters; on failure the collection is untouched. On success
    /// the device gets the next ID and `"Active"` status, and the full
    /// collection is persisted.
    pub fn create(
        &mut self,
        name: &str,
        app_id: &str,
        saved_cpn: &str,
        security_key: &str,
    ) -> StoreResult<Device> {
        if saved_cpn.chars().count() != 8 {
            return Err(StoreError::InvalidCpn);
        }
        self.counter += 1;
        let device = Device {
            id: self.counter,
            name: name.to_string(),
            app_id: app_id.to_string(),
            saved_cpn: saved_cpn.to_string(),
            security_key: security_key.to_string(),
            status: DEFAULT_STATUS.to_string(),
        };
        self.devices.push(device.clone());
        log::info!("Created device {} ('{}').", device.id, device.name);
        self.save()?;
        Ok(device)
    }

    /// Updates a device's name and app ID after verifying the caller
    /// knows one of its secrets. The secrets themselves and the status
    /// are not editable through this path.
    pub fn edit(
        &mut self,
        id: u32,
        secret: &str,
        new_name: &str,
        new_app_id: &str,
    ) -> StoreResult<Device> {
        let device = self
            .devices
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if secret != device.saved_cpn && secret != device.security_key {
            return Err(StoreError::AccessDenied);
        }
        device.name = new_name.to_string();
        device.app_id = new_app_id.to_string();
        let updated = device.clone();
        log::info!("Edited device {} ('{}').", updated.id, updated.name);
        self.save()?;
        Ok(updated)
    }

    /// Appends a batch of records, giving each a fresh ID regardless of
    /// the ID it arrived with, and persists once at the end. Returns the
    /// number imported.
    ///
    /// Imported records are taken as-is: the 8-character CPN rule applies
    /// only at interactive creation.
    pub fn import_from(&mut self, records: Vec<Device>) -> StoreResult<usize> {
        let count = records.len();
        for record in records {
            self.counter += 1;
            self.devices.push(Device {
                id: self.counter,
                ..record
            });
        }
        log::info!("Imported {} devices.", count);
        self.save()?;
        Ok(count)
    }

    /// Reads a JSON device array from `path` and imports it. A read or
    /// parse failure leaves the store untouched.
    pub fn import_from_file(&mut self, path: &Path) -> StoreResult<usize> {
        let content = fs::read_to_string(path)?;
        let records: Vec<Device> = serde_json::from_str(&content)?;
        self.import_from(records)
    }

    /// Writes the full collection to `path`. The store and its default
    /// file are not touched.
    pub fn export_all(&self, path: &Path) -> StoreResult<usize> {
        self.write_devices(&self.devices.iter().collect::<Vec<_>>(), path)
    }

    /// Writes only the devices whose ID appears in `ids` to `path`,
    /// keeping collection order. Unknown IDs are skipped.
    pub fn export_subset(&self, ids: &[u32], path: &Path) -> StoreResult<usize> {
        let selected: Vec<&Device> = self
            .devices
            .iter()
            .filter(|d| ids.contains(&d.id))
            .collect();
        self.write_devices(&selected, path)
    }

    /// Stable in-place sort by name, case-sensitive. Purely a view-order
    /// change; nothing is persisted until the next mutating operation.
    pub fn sort_by_name(&mut self) {
        self.devices.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Stable in-place sort by app ID, case-sensitive.
    pub fn sort_by_app_id(&mut self) {
        self.devices.sort_by(|a, b| a.app_id.cmp(&b.app_id));
    }

    /// The non-sensitive projection of every device, in collection
    /// order. This is the only read path the table view uses.
    pub fn list(&self) -> Vec<DevicePublicView> {
        self.devices.iter().map(Device::public_view).collect()
    }

    pub fn get(&self, id: u32) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Rewrites the default devices file with the full collection. A
    /// failure here is surfaced while the in-memory mutation that
    /// triggered it is kept; callers warn rather than roll back.
    fn save(&self) -> StoreResult<()> {
        self.write_devices(&self.devices.iter().collect::<Vec<_>>(), &self.filepath)?;
        log::debug!(
            "Saved {} devices to {:?}.",
            self.devices.len(),
            self.filepath
        );
        Ok(())
    }

    fn write_devices(&self, devices: &[&Device], path: &Path) -> StoreResult<usize> {
        let json = serde_json::to_string_pretty(devices)?;
        fs::write(path, json)?;
        Ok(devices.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &tempfile::TempDir) -> DeviceStore {
        DeviceStore::new(&dir.path().join("devices.json"))
    }

    #[test]
    fn create_assigns_sequential_ids_from_one() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);

        let first = store.create("Wiimote1", "RMCP01", "ABCDEFGH", "XYZ").unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(first.status, "Active");

        let second = store.create("Wiimote2", "RMCE01", "HGFEDCBA", "ZYX").unwrap();
        let third = store.create("Balance Board", "RFNE01", "12345678", "k").unwrap();
        assert!(second.id > first.id);
        assert!(third.id > second.id);
    }

    #[test]
    fn create_rejects_wrong_length_cpn_without_mutating() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);

        store.create("Wiimote1", "RMCP01", "ABCDEFGH", "XYZ").unwrap();
        assert!(matches!(
            store.create("Wiimote2", "RMCE01", "short", "ZYX"),
            Err(StoreError::InvalidCpn)
        ));
        assert!(matches!(
            store.create("Wiimote3", "RMCE01", "toolong123", "ZYX"),
            Err(StoreError::InvalidCpn)
        ));
        assert_eq!(store.len(), 1);

        // The rejected attempts must not burn counter values either.
        let next = store.create("Wiimote4", "RMCE01", "AAAABBBB", "k").unwrap();
        assert_eq!(next.id, 2);
    }

    #[test]
    fn cpn_length_counts_characters_not_bytes() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        // Eight characters, more than eight bytes.
        store.create("Wiimote", "RMCP01", "ÄÄÄÄÄÄÄÄ", "k").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn edit_requires_one_of_the_two_secrets() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        let device = store.create("Wiimote1", "RMCP01", "ABCDEFGH", "XYZ").unwrap();

        assert!(matches!(
            store.edit(device.id, "wrong", "New", "NEWID"),
            Err(StoreError::AccessDenied)
        ));
        assert_eq!(store.get(device.id).unwrap().name, "Wiimote1");

        let via_cpn = store.edit(device.id, "ABCDEFGH", "Renamed", "RMCE01").unwrap();
        assert_eq!(via_cpn.name, "Renamed");
        assert_eq!(via_cpn.app_id, "RMCE01");

        let via_key = store.edit(device.id, "XYZ", "Renamed2", "RMCJ01").unwrap();
        assert_eq!(via_key.name, "Renamed2");

        // Secrets and status survive an edit unchanged.
        let stored = store.get(device.id).unwrap();
        assert_eq!(stored.saved_cpn, "ABCDEFGH");
        assert_eq!(stored.security_key, "XYZ");
        assert_eq!(stored.status, "Active");
    }

    #[test]
    fn edit_unknown_id_is_not_found() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        assert!(matches!(
            store.edit(42, "secret", "n", "a"),
            Err(StoreError::NotFound(42))
        ));
    }

    #[test]
    fn list_exposes_public_fields_only() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        store.create("Wiimote1", "RMCP01", "ABCDEFGH", "XYZ").unwrap();

        let listing = store.list();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].id, 1);
        assert_eq!(listing[0].name, "Wiimote1");

        let json = serde_json::to_string(&listing).unwrap();
        assert!(!json.contains("ABCDEFGH"));
        assert!(!json.contains("XYZ"));
        assert!(!json.contains("savedCPN"));
        assert!(!json.contains("securityKey"));
    }

    #[test]
    fn export_then_import_preserves_fields_but_not_ids() {
        let dir = tempdir().unwrap();
        let mut source = store_in(&dir);
        source.create("Wiimote1", "RMCP01", "ABCDEFGH", "XYZ").unwrap();
        source.create("Wiimote2", "RMCE01", "HGFEDCBA", "ZYX").unwrap();

        let export_path = dir.path().join("export.json");
        assert_eq!(source.export_all(&export_path).unwrap(), 2);

        let mut target = DeviceStore::new(&dir.path().join("target.json"));
        // Push the target's counter past the source's IDs first.
        target.create("Existing", "X", "QQQQQQQQ", "s").unwrap();
        assert_eq!(target.import_from_file(&export_path).unwrap(), 2);

        assert_eq!(target.len(), 3);
        let imported = target.get(2).unwrap();
        assert_eq!(imported.name, "Wiimote1");
        assert_eq!(imported.app_id, "RMCP01");
        assert_eq!(imported.saved_cpn, "ABCDEFGH");
        assert_eq!(imported.security_key, "XYZ");
        assert_eq!(imported.status, "Active");
        assert_eq!(target.get(3).unwrap().name, "Wiimote2");
    }

    #[test]
    fn import_accepts_odd_cpn_lengths() {
        // Import takes records as-is; files holding odd CPN lengths
        // must keep loading.
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        let records = vec![Device {
            id: 99,
            name: "Legacy".to_string(),
            app_id: "OLD001".to_string(),
            saved_cpn: "short".to_string(),
            security_key: "k".to_string(),
            status: "Active".to_string(),
        }];
        assert_eq!(store.import_from(records).unwrap(), 1);
        let imported = store.get(1).unwrap();
        assert_eq!(imported.saved_cpn, "short");
        assert_eq!(imported.id, 1, "original id 99 must be discarded");
    }

    #[test]
    fn import_failure_leaves_store_untouched() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        store.create("Wiimote1", "RMCP01", "ABCDEFGH", "XYZ").unwrap();

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "not json at all").unwrap();
        assert!(matches!(
            store.import_from_file(&bad),
            Err(StoreError::Json(_))
        ));
        assert!(matches!(
            store.import_from_file(&dir.path().join("missing.json")),
            Err(StoreError::Io(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn export_subset_filters_by_id_in_collection_order() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        store.create("A", "1", "AAAAAAAA", "k").unwrap();
        store.create("B", "2", "BBBBBBBB", "k").unwrap();
        store.create("C", "3", "CCCCCCCC", "k").unwrap();

        let path = dir.path().join("subset.json");
        assert_eq!(store.export_subset(&[3, 1, 7], &path).unwrap(), 2);

        let exported: Vec<Device> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(exported.len(), 2);
        assert_eq!(exported[0].name, "A");
        assert_eq!(exported[1].name, "C");
        // Export does not rewrite the default file.
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn sorts_are_case_sensitive_and_stable() {
        let dir = tempdir().unwrap();
        let mut store = store_in(&dir);
        store.create("banana", "Z2", "AAAAAAAA", "k").unwrap();
        store.create("Apple", "Z1", "BBBBBBBB", "k").unwrap();
        store.create("apple", "Z1", "CCCCCCCC", "k").unwrap();

        store.sort_by_name();
        let names: Vec<String> = store.list().into_iter().map(|d| d.name).collect();
        // Uppercase sorts before lowercase in a case-sensitive compare.
        assert_eq!(names, vec!["Apple", "apple", "banana"]);

        store.sort_by_app_id();
        let ids: Vec<u32> = store.list().into_iter().map(|d| d.id).collect();
        // Equal app IDs keep their relative order from the name sort.
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn sort_does_not_touch_the_saved_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("devices.json");
        let mut store = DeviceStore::new(&path);
        store.create("b", "2", "AAAAAAAA", "k").unwrap();
        store.create("a", "1", "BBBBBBBB", "k").unwrap();

        let before = fs::read_to_string(&path).unwrap();
        store.sort_by_name();
        assert_eq!(fs::read_to_string(&path).unwrap(), before);

        // The next persisting mutation writes the new order.
        store.create("c", "3", "CCCCCCCC", "k").unwrap();
        let saved: Vec<Device> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved[0].name, "a");
        assert_eq!(saved[1].name, "b");
    }

    #[test]
    fn mutations_rewrite_the_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("devices.json");
        let mut store = DeviceStore::new(&path);

        let device = store.create("Wiimote1", "RMCP01", "ABCDEFGH", "XYZ").unwrap();
        let saved: Vec<Device> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved, vec![device.clone()]);

        store.edit(device.id, "XYZ", "Renamed", "RMCE01").unwrap();
        let saved: Vec<Device> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved[0].name, "Renamed");
    }
}
