use crate::provision::RenderError;
use handlebars::Handlebars;
use serde::Serialize;

const INSTALLER_TEMPLATE_NAME: &str = "installer";
const INVENTORY_TEMPLATE_NAME: &str = "hosts";

/// Package installed when no version is pinned
pub const ANSIBLE_PACKAGE: &str = "ansible";

const INSTALLER_TEMPLATE: &str = r#"#!/usr/bin/env bash
if [ -z "$(which ansible-playbook)" ]; then

  # only wait for cloud-init when it manages this machine
  if [ -d /var/lib/cloud/instance ]; then
    until [[ -f /var/lib/cloud/instance/boot-finished ]]; do
      sleep 1
    done
  fi

  # build prerequisites
  if [[ -f /etc/redhat-release ]]; then
    yum update -y \
    && yum groupinstall -y "Development Tools" \
    && yum install -y python-devel
  else
    apt-get update \
    && apt-get install -y build-essential python-dev
  fi

  # pip, if necessary
  if [ -z "$(which pip)" ]; then
    curl https://bootstrap.pypa.io/get-pip.py | sudo python
  fi

  pip install {{package}}

else

  expected_version="{{package}}"
  installed_version=$(ansible-playbook --version | head -n1 | awk '{print $2}')
  installed_version="ansible==$installed_version"
  if [[ "$expected_version" = *"=="* ]]; then
    if [ "$expected_version" != "$installed_version" ]; then
      pip install $expected_version
    fi
  fi

fi
"#;

// Block tags never stand alone on a line, so the output does not depend on
// standalone-line whitespace handling.
const INVENTORY_TEMPLATE: &str = concat!(
    "{{#each hosts}}{{this}} ansible_connection=local\n",
    "{{/each}}{{#each groups}}\n",
    "[{{this}}]\n",
    "{{#each ../hosts}}{{this}} ansible_connection=local\n",
    "{{/each}}{{/each}}\n",
);

#[derive(Serialize)]
struct InstallerContext<'a> {
    package: &'a str,
}

#[derive(Serialize)]
struct InventoryContext<'a> {
    hosts: &'a [String],
    groups: &'a [String],
}

/// Renders the installer script and the inventory file.
pub struct ArtifactRenderer {
    handlebars: Handlebars<'static>,
}

impl ArtifactRenderer {
    pub fn new() -> Result<Self, RenderError> {
        Self::with_templates(INSTALLER_TEMPLATE, INVENTORY_TEMPLATE)
    }

    fn with_templates(installer: &str, inventory: &str) -> Result<Self, RenderError> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(true);
        handlebars.register_escape_fn(handlebars::no_escape);

        for (name, source) in [
            (INSTALLER_TEMPLATE_NAME, installer),
            (INVENTORY_TEMPLATE_NAME, inventory),
        ] {
            handlebars
                .register_template_string(name, source)
                .map_err(|e| RenderError::Template {
                    name: name.to_string(),
                    reason: e.to_string(),
                })?;
        }

        Ok(Self { handlebars })
    }

    /// Renders the bootstrap script. An empty `version` installs the latest
    /// release; otherwise the package is pinned with `==`.
    pub fn render_installer(&self, version: &str) -> Result<String, RenderError> {
        let package = installer_package(version);
        self.render(INSTALLER_TEMPLATE_NAME, &InstallerContext { package: &package })
    }

    /// Renders an inventory listing every host, then one section per group
    /// that again lists every host.
    pub fn render_inventory(
        &self,
        hosts: &[String],
        groups: &[String],
    ) -> Result<String, RenderError> {
        self.render(INVENTORY_TEMPLATE_NAME, &InventoryContext { hosts, groups })
    }

    fn render<T: Serialize>(&self, name: &str, context: &T) -> Result<String, RenderError> {
        self.handlebars
            .render(name, context)
            .map_err(|e| RenderError::Rendering {
                name: name.to_string(),
                reason: e.to_string(),
            })
    }
}

/// `ansible` or `ansible==<version>`
pub fn installer_package(version: &str) -> String {
    if version.is_empty() {
        ANSIBLE_PACKAGE.to_string()
    } else {
        format!("{ANSIBLE_PACKAGE}=={version}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_inventory_with_group() {
        let renderer = ArtifactRenderer::new().unwrap();
        let inventory = renderer
            .render_inventory(&strings(&["web1", "localhost"]), &strings(&["app"]))
            .unwrap();

        assert_eq!(
            inventory,
            "web1 ansible_connection=local\n\
             localhost ansible_connection=local\n\
             \n\
             [app]\n\
             web1 ansible_connection=local\n\
             localhost ansible_connection=local\n\
             \n"
        );
    }

    #[test]
    fn test_every_group_lists_every_host() {
        let renderer = ArtifactRenderer::new().unwrap();
        let hosts = strings(&["db1", "web1", "localhost"]);
        let inventory = renderer
            .render_inventory(&hosts, &strings(&["app", "db"]))
            .unwrap();

        let sections: Vec<&str> = inventory.split("\n[").skip(1).collect();
        assert_eq!(sections.len(), 2);
        for section in sections {
            for host in &hosts {
                assert!(section.contains(&format!("{host} ansible_connection=local")));
            }
        }
    }

    #[test]
    fn test_inventory_without_groups() {
        let renderer = ArtifactRenderer::new().unwrap();
        let inventory = renderer
            .render_inventory(&strings(&["localhost"]), &[])
            .unwrap();
        assert_eq!(inventory, "localhost ansible_connection=local\n\n");
    }

    #[test]
    fn test_inventory_is_deterministic() {
        let renderer = ArtifactRenderer::new().unwrap();
        let hosts = strings(&["a", "b", "localhost"]);
        let groups = strings(&["g1", "g2"]);
        let first = renderer.render_inventory(&hosts, &groups).unwrap();
        let second = renderer.render_inventory(&hosts, &groups).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_hosts_are_not_escaped() {
        let renderer = ArtifactRenderer::new().unwrap();
        let inventory = renderer
            .render_inventory(&strings(&["web&1", "localhost"]), &[])
            .unwrap();
        assert!(inventory.starts_with("web&1 ansible_connection=local\n"));
    }

    #[test]
    fn test_installer_latest() {
        let renderer = ArtifactRenderer::new().unwrap();
        let script = renderer.render_installer("").unwrap();
        assert!(script.starts_with("#!/usr/bin/env bash\n"));
        assert!(script.contains("pip install ansible\n"));
        assert!(script.contains("expected_version=\"ansible\""));
        assert!(script.contains("/var/lib/cloud/instance/boot-finished"));
    }

    #[test]
    fn test_installer_pinned() {
        let renderer = ArtifactRenderer::new().unwrap();
        let script = renderer.render_installer("2.9.1").unwrap();
        assert!(script.contains("pip install ansible==2.9.1\n"));
        assert!(script.contains("expected_version=\"ansible==2.9.1\""));
        assert!(script.contains(r#"if [[ "$expected_version" = *"=="* ]]; then"#));
    }

    #[test]
    fn test_malformed_template_is_reported() {
        let result = ArtifactRenderer::with_templates("{{#each hosts}}", INVENTORY_TEMPLATE);
        assert!(matches!(result, Err(RenderError::Template { .. })));
    }
}
