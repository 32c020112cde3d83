//! Fields the server assigns on create and refuses to change afterwards.
//!
//! Before an update the values found on the live object are copied over
//! whatever the template says, so re-applying a manifest that omits them
//! (or sets them differently) does not fail.

use kubedeploy_core::{GroupVersionKind, ResourceObject};

struct PreservedFields {
    group: &'static str,
    kind: &'static str,
    paths: &'static [&'static [&'static str]],
}

const POLICY: &[PreservedFields] = &[PreservedFields {
    group: "",
    kind: "Service",
    paths: &[&["spec", "clusterIP"], &["spec", "clusterIPs"]],
}];

/// Field paths preserved for `gvk`; empty for kinds without a policy.
pub fn preserved_paths(gvk: &GroupVersionKind) -> &'static [&'static [&'static str]] {
    POLICY
        .iter()
        .find(|p| p.group == gvk.group && p.kind == gvk.kind)
        .map(|p| p.paths)
        .unwrap_or_default()
}

/// Copy preserved fields from `live` into `desired`.
///
/// A field absent on the live object is removed from `desired` too.
pub fn preserve_server_fields(live: &ResourceObject, desired: &mut ResourceObject) {
    for path in preserved_paths(&desired.gvk()) {
        match live.get_path(path) {
            Some(value) => desired.set_path(path, value.clone()),
            None => {
                desired.remove_path(path);
            }
        }
    }
}
