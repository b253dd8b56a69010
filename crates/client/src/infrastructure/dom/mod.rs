//! Page markup driving hook bindings and broadcasts.
//!
//! The browser adapter observes the document and reports every element that
//! carries `phx-hook` and an `id`. `plan_mounts` turns such a scan into the
//! attach and detach calls that bring the registry in line with the page.

#[cfg(target_arch = "wasm32")]
mod web;

#[cfg(target_arch = "wasm32")]
pub use web::DomBridge;

use std::collections::HashMap;

/// An element found on the page during a scan.
#[derive(Debug, Clone)]
pub struct FoundHook<N> {
    pub element_id: String,
    pub hook_name: String,
    pub node: N,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountAction {
    Attach { element_id: String, hook_name: String },
    Detach { element_id: String },
}

/// Compare `mounted` (id to hook name and node) with a fresh scan.
///
/// Elements that are new, renamed to another hook, or re-rendered as a
/// different node are (re)attached. Mounted ids missing from the scan are
/// detached. Detaches come first; attaches keep document order.
pub fn plan_mounts<N>(
    mounted: &HashMap<String, (String, N)>,
    found: &[FoundHook<N>],
    same_node: impl Fn(&N, &N) -> bool,
) -> Vec<MountAction> {
    let mut gone: Vec<&String> = mounted
        .keys()
        .filter(|id| !found.iter().any(|f| &f.element_id == *id))
        .collect();
    gone.sort();

    let mut actions: Vec<MountAction> = gone
        .into_iter()
        .map(|id| MountAction::Detach {
            element_id: id.clone(),
        })
        .collect();

    for hook in found {
        let unchanged = mounted
            .get(&hook.element_id)
            .is_some_and(|(name, node)| *name == hook.hook_name && same_node(node, &hook.node));
        if !unchanged {
            actions.push(MountAction::Attach {
                element_id: hook.element_id.clone(),
                hook_name: hook.hook_name.clone(),
            });
        }
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(id: &str, hook: &str, node: u32) -> FoundHook<u32> {
        FoundHook {
            element_id: id.to_string(),
            hook_name: hook.to_string(),
            node,
        }
    }

    fn mounted(entries: &[(&str, &str, u32)]) -> HashMap<String, (String, u32)> {
        entries
            .iter()
            .map(|(id, hook, node)| (id.to_string(), (hook.to_string(), *node)))
            .collect()
    }

    #[test]
    fn test_first_scan_attaches_everything_in_order() {
        let actions = plan_mounts(
            &HashMap::new(),
            &[found("player-form", "SetPlayerName", 1), found("copy", "Clipboard", 2)],
            |a, b| a == b,
        );

        assert_eq!(
            actions,
            vec![
                MountAction::Attach {
                    element_id: "player-form".into(),
                    hook_name: "SetPlayerName".into()
                },
                MountAction::Attach {
                    element_id: "copy".into(),
                    hook_name: "Clipboard".into()
                },
            ]
        );
    }

    #[test]
    fn test_unchanged_scan_is_quiet() {
        let current = mounted(&[("copy", "Clipboard", 2)]);

        let actions = plan_mounts(&current, &[found("copy", "Clipboard", 2)], |a, b| a == b);

        assert!(actions.is_empty());
    }

    #[test]
    fn test_removed_element_is_detached() {
        let current = mounted(&[("copy", "Clipboard", 2), ("player-form", "SetPlayerName", 1)]);

        let actions = plan_mounts(&current, &[found("copy", "Clipboard", 2)], |a, b| a == b);

        assert_eq!(
            actions,
            vec![MountAction::Detach {
                element_id: "player-form".into()
            }]
        );
    }

    #[test]
    fn test_rerendered_node_is_reattached() {
        let current = mounted(&[("copy", "Clipboard", 2)]);

        let actions = plan_mounts(&current, &[found("copy", "Clipboard", 7)], |a, b| a == b);

        assert_eq!(
            actions,
            vec![MountAction::Attach {
                element_id: "copy".into(),
                hook_name: "Clipboard".into()
            }]
        );
    }
}
