//! Per-manager command templates (spec §4.7 step 1).

use std::time::Duration;

use winpacman_model::{Manager, OperationKind};
use winpacman_process::{Invocation, INSTALL_TIMEOUT, UNINSTALL_TIMEOUT};

/// Build the `Invocation` for a given manager/op/package, following the
/// literal templates spec §4.7 step 1 lists. `version` is only honored
/// by WinGet installs; every other manager's template has no version
/// slot.
pub fn invocation_for(manager: Manager, op: OperationKind, package_id: &str, version: Option<&str>) -> Option<Invocation> {
    let timeout = match op {
        OperationKind::Install => INSTALL_TIMEOUT,
        OperationKind::Uninstall => UNINSTALL_TIMEOUT,
    };

    let invocation = match (manager, op) {
        (Manager::Winget, OperationKind::Install) => {
            let mut inv = Invocation::new("winget", "winget").arg("install").arg("--id").arg(package_id);
            if let Some(version) = version {
                inv = inv.arg("--version").arg(version);
            }
            inv.arg("--accept-source-agreements").arg("--accept-package-agreements")
        }
        (Manager::Winget, OperationKind::Uninstall) => {
            Invocation::new("winget", "winget").arg("uninstall").arg("--id").arg(package_id)
        }
        (Manager::Chocolatey, OperationKind::Install) => {
            Invocation::new("choco", "chocolatey").arg("install").arg(package_id).arg("-y")
        }
        (Manager::Chocolatey, OperationKind::Uninstall) => {
            Invocation::new("choco", "chocolatey").arg("uninstall").arg(package_id).arg("-y")
        }
        (Manager::Scoop, OperationKind::Install) => Invocation::new("scoop", "scoop").arg("install").arg(package_id),
        (Manager::Scoop, OperationKind::Uninstall) => Invocation::new("scoop", "scoop").arg("uninstall").arg(package_id),
        (Manager::Npm, OperationKind::Install) => {
            // npm ships as `npm.cmd` on Windows; it must go through the
            // platform shell (spec §4.1 Windows quirk, §4.7 step 1).
            Invocation::new("npm", "npm").arg("install").arg("-g").arg(package_id).use_shell(true)
        }
        (Manager::Npm, OperationKind::Uninstall) => {
            Invocation::new("npm", "npm").arg("uninstall").arg("-g").arg(package_id).use_shell(true)
        }
        (Manager::Cargo, OperationKind::Install) => Invocation::new("cargo", "cargo").arg("install").arg(package_id),
        (Manager::Cargo, OperationKind::Uninstall) => Invocation::new("cargo", "cargo").arg("uninstall").arg(package_id),
        // Msstore and Unknown never back an installable ecosystem; the
        // engine's caller is expected to have refused these already.
        (Manager::Msstore, _) | (Manager::Unknown, _) => return None,
    };

    Some(invocation.timeout(timeout))
}

pub fn timeout_for(op: OperationKind) -> Duration {
    match op {
        OperationKind::Install => INSTALL_TIMEOUT,
        OperationKind::Uninstall => UNINSTALL_TIMEOUT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn winget_install_with_version_includes_version_flag() {
        let inv = invocation_for(Manager::Winget, OperationKind::Install, "Microsoft.VisualStudioCode", Some("1.94.0")).unwrap();
        assert_eq!(format!("{inv:?}").contains("--version"), true);
    }

    #[test]
    fn msstore_has_no_template() {
        assert!(invocation_for(Manager::Msstore, OperationKind::Install, "x", None).is_none());
    }

    #[test]
    fn unknown_has_no_template() {
        assert!(invocation_for(Manager::Unknown, OperationKind::Uninstall, "x", None).is_none());
    }
}
