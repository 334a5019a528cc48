//! Read-only views over synthesized CloudFormation templates
//!
//! `cdk synth` writes one `<Stack>.template.json` per stack into `cdk.out`.
//! These types expose the parts tests assert on (resources by type, their
//! properties, stack outputs) without handing out the raw JSON tree.

use crate::error::{CdkTestError, CdkTestResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const TEMPLATE_SUFFIX: &str = ".template.json";

#[derive(Debug, Deserialize)]
struct RawTemplate {
    #[serde(rename = "Resources", default)]
    resources: BTreeMap<String, RawResource>,
    #[serde(rename = "Outputs", default)]
    outputs: BTreeMap<String, Value>,
    #[serde(rename = "Parameters", default)]
    parameters: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawResource {
    #[serde(rename = "Type")]
    resource_type: String,
    #[serde(rename = "Properties", default)]
    properties: BTreeMap<String, Value>,
}

/// One resource in a template
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    logical_id: String,
    resource_type: String,
    properties: BTreeMap<String, Value>,
}

impl Resource {
    /// Logical ID (the key under `Resources`)
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// CloudFormation type, e.g. `AWS::EC2::VPC`
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// A property value, if set
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// A property value that is a plain string
    pub fn property_str(&self, name: &str) -> Option<&str> {
        self.property(name).and_then(Value::as_str)
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }
}

/// A parsed CloudFormation template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    resources: Vec<Resource>,
    outputs: BTreeMap<String, Value>,
    parameters: BTreeMap<String, Value>,
}

impl Template {
    /// Parse a template from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: RawTemplate = serde_json::from_str(json)?;

        let resources = raw
            .resources
            .into_iter()
            .map(|(logical_id, r)| Resource {
                logical_id,
                resource_type: r.resource_type,
                properties: r.properties,
            })
            .collect();

        Ok(Self {
            resources,
            outputs: raw.outputs,
            parameters: raw.parameters,
        })
    }

    /// Load a template file
    pub fn load(path: &Path) -> CdkTestResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CdkTestError::io(format!("reading template {}", path.display()), e))?;

        Self::from_json(&content).map_err(|e| CdkTestError::TemplateParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// All resources, ordered by logical ID
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Resources of one CloudFormation type, ordered by logical ID
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }

    /// Look up a resource by logical ID
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.logical_id == logical_id)
    }

    /// Distinct resource types with their counts
    pub fn resource_types(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for resource in &self.resources {
            *counts.entry(resource.resource_type.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// A stack output definition
    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.keys().map(String::as_str)
    }
}

/// Every stack template in a `cdk.out` directory
#[derive(Debug, Clone)]
pub struct CloudAssembly {
    dir: PathBuf,
    stacks: BTreeMap<String, Template>,
}

impl CloudAssembly {
    /// Load every `*.template.json` in `dir`
    pub fn load(dir: &Path) -> CdkTestResult<Self> {
        if !dir.is_dir() {
            return Err(CdkTestError::AssemblyNotFound(dir.to_path_buf()));
        }

        let read_dir = fs::read_dir(dir)
            .map_err(|e| CdkTestError::io(format!("reading {}", dir.display()), e))?;

        let mut stacks = BTreeMap::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| CdkTestError::io("reading assembly entry", e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(stack) = name.strip_suffix(TEMPLATE_SUFFIX) else {
                continue;
            };
            debug!("Loading template for stack {}", stack);
            stacks.insert(stack.to_string(), Template::load(&entry.path())?);
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            stacks,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stack names, sorted
    pub fn stack_names(&self) -> impl Iterator<Item = &str> {
        self.stacks.keys().map(String::as_str)
    }

    pub fn stack(&self, name: &str) -> Option<&Template> {
        self.stacks.get(name)
    }

    /// Resources of one type across every stack
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<&Resource> {
        self.stacks
            .values()
            .flat_map(|t| t.resources_of_type(resource_type))
            .collect()
    }
}
