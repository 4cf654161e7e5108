// Mounted-volume filtering and disk identity (diskutil plist / lsblk JSON)

use crate::models::Volume;

/// System and snapshot volumes that are never shown.
pub const IGNORED_VOLUME_NAMES: &[&str] = &[
    "Preboot",
    "Recovery",
    "VM",
    "Update",
    "com.apple.TimeMachine.localsnapshots",
];

/// Primary boot volume name on a stock macOS install.
pub const BOOT_VOLUME_NAME: &str = "Macintosh HD";

/// Whether an enumerated volume belongs in the disk list.
///
/// Non-browsable and ignore-listed volumes are dropped. External volumes are always
/// kept; an internal volume is kept only when it is the primary boot volume.
pub fn is_listed(volume: &Volume) -> bool {
    if !volume.is_browsable || is_ignored_name(&volume.name) {
        return false;
    }
    if !volume.is_internal {
        return true;
    }
    volume.mount_path == "/" || volume.name == BOOT_VOLUME_NAME
}

fn is_ignored_name(name: &str) -> bool {
    name.trim().is_empty()
        || name.contains("Simulator")
        || IGNORED_VOLUME_NAMES
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(name))
}

/// Whether a mount point is user-visible. On macOS only `/` and `/Volumes/*` are;
/// everything under `/System/Volumes` is an APFS support volume.
#[cfg(target_os = "macos")]
pub fn is_browsable_mount(mount_path: &str, _file_system: &str) -> bool {
    mount_path == "/" || mount_path.starts_with("/Volumes/")
}

#[cfg(not(target_os = "macos"))]
pub fn is_browsable_mount(mount_path: &str, file_system: &str) -> bool {
    const HIDDEN_PREFIXES: &[&str] = &["/proc", "/sys", "/dev", "/run", "/snap", "/boot", "/var/lib"];
    const VIRTUAL_FS: &[&str] = &["overlay", "tmpfs", "devtmpfs", "squashfs", "proc", "sysfs"];
    if VIRTUAL_FS.contains(&file_system) {
        return false;
    }
    !HIDDEN_PREFIXES
        .iter()
        .any(|p| mount_path == *p || mount_path.starts_with(&format!("{p}/")))
}

// ---------------------------------------------------------------------------
// diskutil info -plist
// ---------------------------------------------------------------------------

/// Value of `<key>{key}</key><string>…</string>` in an XML property list.
pub fn plist_string(xml: &str, key: &str) -> Option<String> {
    let after = plist_after_key(xml, key)?;
    let after = after.trim_start();
    let value = after.strip_prefix("<string>")?;
    let end = value.find("</string>")?;
    let value = value[..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Value of `<key>{key}</key><true/>` / `<false/>` in an XML property list.
pub fn plist_bool(xml: &str, key: &str) -> Option<bool> {
    let after = plist_after_key(xml, key)?.trim_start();
    if after.starts_with("<true/>") {
        Some(true)
    } else if after.starts_with("<false/>") {
        Some(false)
    } else {
        None
    }
}

fn plist_after_key<'a>(xml: &'a str, key: &str) -> Option<&'a str> {
    let tag = format!("<key>{key}</key>");
    let pos = xml.find(&tag)?;
    Some(&xml[pos + tag.len()..])
}

/// Whole-disk identifier (e.g. "disk4") preferred over the partition identifier.
pub fn parse_diskutil_identifier(xml: &str) -> Option<String> {
    plist_string(xml, "ParentWholeDisk").or_else(|| plist_string(xml, "DeviceIdentifier"))
}

pub fn parse_diskutil_ejectable(xml: &str) -> Option<bool> {
    plist_bool(xml, "Ejectable")
}

// ---------------------------------------------------------------------------
// lsblk -J
// ---------------------------------------------------------------------------

fn first_block_device(json: &str) -> Option<serde_json::Value> {
    let v: serde_json::Value = serde_json::from_str(json).ok()?;
    v.get("blockdevices")?.as_array()?.first().cloned()
}

/// Parent whole-disk name (`pkname`) preferred over the device's own name.
pub fn parse_lsblk_identifier(json: &str) -> Option<String> {
    let dev = first_block_device(json)?;
    let non_empty = |key: &str| {
        dev.get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    non_empty("pkname").or_else(|| non_empty("name"))
}

/// Removable or hot-pluggable. lsblk prints flags as JSON booleans on recent
/// util-linux and as "0"/"1" strings on older releases.
pub fn parse_lsblk_ejectable(json: &str) -> Option<bool> {
    let dev = first_block_device(json)?;
    let flag = |key: &str| match dev.get(key)? {
        serde_json::Value::Bool(b) => Some(*b),
        serde_json::Value::String(s) => Some(s.trim() == "1"),
        serde_json::Value::Number(n) => Some(n.as_u64() == Some(1)),
        _ => None,
    };
    match (flag("rm"), flag("hotplug")) {
        (None, None) => None,
        (rm, hotplug) => Some(rm.unwrap_or(false) || hotplug.unwrap_or(false)),
    }
}
