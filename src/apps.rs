// Process aggregator: resolve raw commands to application names, merge rows per
// application, rank and truncate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::{Process, ProcessRow};
use crate::probe::plist_string;

/// Entries at or below this CPU percentage are dropped from the CPU ranking.
pub const CPU_NOISE_FLOOR: f64 = 0.1;
/// Entries at or below this many megabytes are dropped from the memory ranking.
pub const MEMORY_NOISE_FLOOR_MB: f64 = 1.0;

/// Case-insensitive substring → display name. Checked in order against the whole
/// command, so helper and renderer processes fold into their parent application.
const NAME_OVERRIDES: &[(&str, &str)] = &[
    ("google chrome", "Google Chrome"),
    ("firefox", "Firefox"),
    ("safari", "Safari"),
    ("iterm", "iTerm"),
    ("terminal", "Terminal"),
    ("visual studio code", "Visual Studio Code"),
    ("code helper", "Visual Studio Code"),
    ("xcode", "Xcode"),
    ("zoom.us", "Zoom"),
    ("slack", "Slack"),
    ("microsoft teams", "Microsoft Teams"),
    ("discord", "Discord"),
];

const EXCLUDED_NAMES: &[&str] = &["kernel_task", "(null)", "?", "-", "<defunct>"];

/// Looks up an application's display name from its executable path.
pub trait AppRegistry: Send + Sync {
    fn display_name(&self, command: &str) -> Option<String>;
}

/// Registry that knows nothing; names come from overrides and basenames only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRegistry;

impl AppRegistry for NoRegistry {
    fn display_name(&self, _command: &str) -> Option<String> {
        None
    }
}

/// Resolves `/path/Foo.app/Contents/...` to the bundle's `CFBundleDisplayName` (or
/// `CFBundleName`) read from `Foo.app/Contents/Info.plist`. Lookups are cached per
/// bundle, including misses.
#[derive(Debug, Default)]
pub struct BundleRegistry {
    cache: Mutex<HashMap<PathBuf, Option<String>>>,
}

impl BundleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_bundle_name(bundle: &Path) -> Option<String> {
        let xml = std::fs::read_to_string(bundle.join("Contents").join("Info.plist")).ok()?;
        plist_string(&xml, "CFBundleDisplayName").or_else(|| plist_string(&xml, "CFBundleName"))
    }
}

/// Outermost `*.app` directory in an executable path.
pub fn bundle_path(command: &str) -> Option<PathBuf> {
    let end = command.find(".app/").map(|i| i + ".app".len()).or_else(|| {
        command.ends_with(".app").then_some(command.len())
    })?;
    Some(PathBuf::from(&command[..end]))
}

impl AppRegistry for BundleRegistry {
    fn display_name(&self, command: &str) -> Option<String> {
        let bundle = bundle_path(command)?;
        if let Ok(cache) = self.cache.lock()
            && let Some(hit) = cache.get(&bundle)
        {
            return hit.clone();
        }
        let name = Self::read_bundle_name(&bundle);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(bundle, name.clone());
        }
        name
    }
}

/// Display name for a raw command, or `None` for rows that are not applications
/// (kernel task, placeholders, reverse-DNS service identifiers).
pub fn resolve_name(command: &str, registry: &dyn AppRegistry) -> Option<String> {
    let command = command.trim();
    if command.is_empty() {
        return None;
    }

    // Overrides match the executable name, never its parent directories.
    let base = command.rsplit('/').next().unwrap_or(command).trim();
    let lower = base.to_lowercase();
    if let Some((_, name)) = NAME_OVERRIDES.iter().find(|(needle, _)| lower.contains(needle)) {
        return Some((*name).to_string());
    }

    if let Some(name) = registry.display_name(command).filter(|n| !n.trim().is_empty()) {
        return Some(name);
    }

    if is_reverse_dns(base) {
        return None;
    }
    let name = strip_extension(base);
    if name.is_empty()
        || name.starts_with('[')
        || EXCLUDED_NAMES.iter().any(|x| x.eq_ignore_ascii_case(name))
    {
        return None;
    }
    Some(name.to_string())
}

/// `com.apple.WebKit.Networking`, `org.mozilla.updater`: at least three dot-separated
/// segments, no spaces, and a lowercase leading segment.
fn is_reverse_dns(name: &str) -> bool {
    if name.contains(char::is_whitespace) {
        return false;
    }
    let segments: Vec<&str> = name.split('.').collect();
    segments.len() >= 3
        && segments.iter().all(|s| !s.is_empty())
        && segments[0].chars().all(|c| c.is_ascii_lowercase())
}

/// Drop a short alphabetic extension ("Foo.app", "script.py"); leave version-like
/// suffixes alone.
fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphabetic()) =>
        {
            stem
        }
        _ => name,
    }
}

/// Group rows by resolved name, preserving first-seen order.
fn group(
    rows: &[ProcessRow],
    registry: &dyn AppRegistry,
    mut merge: impl FnMut(&mut Process, &ProcessRow),
) -> Vec<(Process, usize)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(Process, usize)> = Vec::new();
    for row in rows {
        let Some(name) = resolve_name(&row.command, registry) else {
            continue;
        };
        match index.get(&name) {
            Some(&i) => {
                let (entry, count) = &mut groups[i];
                merge(entry, row);
                *count += 1;
            }
            None => {
                index.insert(name.clone(), groups.len());
                groups.push((
                    Process {
                        pid: row.pid,
                        name,
                        cpu_percent: row.cpu_percent,
                        memory_mb: row.memory_mb,
                    },
                    1,
                ));
            }
        }
    }
    groups
}

fn rank(mut apps: Vec<Process>, n: usize, key: impl Fn(&Process) -> f64) -> Vec<Process> {
    apps.sort_by(|a, b| key(b).total_cmp(&key(a)));
    apps.truncate(n);
    apps
}

/// Top `n` applications by summed CPU percentage. The first-seen pid of each
/// application is kept.
pub fn top_cpu_apps(rows: &[ProcessRow], n: usize, registry: &dyn AppRegistry) -> Vec<Process> {
    let apps = group(rows, registry, |entry, row| {
        entry.cpu_percent += row.cpu_percent;
    })
    .into_iter()
    .map(|(p, _)| p)
    .filter(|p| p.cpu_percent > CPU_NOISE_FLOOR)
    .collect();
    rank(apps, n, |p| p.cpu_percent)
}

/// Top `n` applications by summed resident memory. Entries merged from several
/// processes carry no pid.
pub fn top_memory_apps(
    rows: &[ProcessRow],
    n: usize,
    registry: &dyn AppRegistry,
) -> Vec<Process> {
    let apps = group(rows, registry, |entry, row| {
        entry.memory_mb += row.memory_mb;
    })
    .into_iter()
    .map(|(mut p, count)| {
        if count > 1 {
            p.pid = None;
        }
        p
    })
    .filter(|p| p.memory_mb > MEMORY_NOISE_FLOOR_MB)
    .collect();
    rank(apps, n, |p| p.memory_mb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_fold_helpers() {
        let r = NoRegistry;
        let helper = "/Applications/Google Chrome.app/Contents/Frameworks/Google Chrome Framework.framework/Helpers/Google Chrome Helper (Renderer).app/Contents/MacOS/Google Chrome Helper (Renderer)";
        assert_eq!(resolve_name(helper, &r).as_deref(), Some("Google Chrome"));
        assert_eq!(
            resolve_name("/Applications/Visual Studio Code.app/Contents/Frameworks/Code Helper (Plugin).app/Contents/MacOS/Code Helper (Plugin)", &r).as_deref(),
            Some("Visual Studio Code")
        );
        assert_eq!(resolve_name("/usr/lib/firefox/firefox-bin", &r).as_deref(), Some("Firefox"));
    }

    #[test]
    fn basename_without_extension() {
        let r = NoRegistry;
        assert_eq!(resolve_name("/usr/bin/python3", &r).as_deref(), Some("python3"));
        assert_eq!(resolve_name("/opt/tools/run.sh", &r).as_deref(), Some("run"));
        assert_eq!(resolve_name("WindowServer", &r).as_deref(), Some("WindowServer"));
        assert_eq!(resolve_name("/usr/bin/python3.11", &r).as_deref(), Some("python3.11"));
    }

    #[test]
    fn non_applications_are_dropped() {
        let r = NoRegistry;
        assert_eq!(resolve_name("kernel_task", &r), None);
        assert_eq!(resolve_name("   ", &r), None);
        assert_eq!(resolve_name("(null)", &r), None);
        assert_eq!(
            resolve_name("/System/Library/Frameworks/WebKit.framework/XPCServices/com.apple.WebKit.Networking", &r),
            None
        );
    }

    #[test]
    fn bundle_path_takes_outermost_app() {
        assert_eq!(
            bundle_path("/Applications/Foo.app/Contents/Helpers/Bar.app/Contents/MacOS/Bar"),
            Some(PathBuf::from("/Applications/Foo.app"))
        );
        assert_eq!(bundle_path("/usr/bin/true"), None);
    }

    #[test]
    fn bundle_registry_reads_info_plist() {
        let dir = tempfile::tempdir().unwrap();
        let contents = dir.path().join("Notes Thing.app").join("Contents");
        std::fs::create_dir_all(&contents).unwrap();
        std::fs::write(
            contents.join("Info.plist"),
            "<dict><key>CFBundleName</key><string>Notes</string></dict>",
        )
        .unwrap();
        let exe = contents.join("MacOS").join("NotesThing");
        let registry = BundleRegistry::new();
        let exe = exe.to_string_lossy();
        assert_eq!(registry.display_name(&exe).as_deref(), Some("Notes"));
        assert_eq!(resolve_name(&exe, &registry).as_deref(), Some("Notes"));
    }
}
