//! Fixed locations on the target host.

/// Root of everything uploaded for one run
pub const BOOTSTRAP_DIRECTORY: &str = "/tmp/ansible-terraform-bootstrap";

pub const INVENTORY_FILE_PATH: &str =
    "/tmp/ansible-terraform-bootstrap/.inventory-ansible-bootstrap/hosts";

pub const VAULT_DIRECTORY: &str = "/tmp/ansible-terraform-bootstrap/.vault-ansible-bootstrap";

pub const INSTALLER_PATH: &str = "/tmp/ansible-install.sh";

/// Joins remote paths with `/` regardless of the local platform.
pub fn remote_join(base: &str, name: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), name.trim_start_matches('/'))
}

/// Parent directory of a remote path
pub fn remote_parent(path: &str) -> &str {
    match path.trim_end_matches('/').rfind('/') {
        Some(0) => "/",
        Some(index) => &path[..index],
        None => ".",
    }
}
