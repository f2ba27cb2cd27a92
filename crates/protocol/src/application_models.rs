//! Application (interactive widget) models.
//!
//! Applications are packages loaded into a running interpreter process and
//! bound to a notebook paragraph. This module defines the package descriptor
//! sent to the interpreter, the application status machine, and the output
//! types an application can produce.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Kind of package an [`ApplicationPackage`] describes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageType {
    Application,
    Visualization,
    Spell,
    Interpreter,
}

/// Descriptor of a loadable application package.
///
/// Serialized to JSON and shipped to the interpreter process as the load
/// payload.
///
/// # Example
///
/// ```json
/// {
///   "type": "APPLICATION",
///   "name": "clock",
///   "description": "Shows the interpreter clock",
///   "artifact": "clock-app@1.0.0",
///   "className": "org.example.ClockApp",
///   "resources": [["clock.min.js"]],
///   "license": "Apache-2.0",
///   "icon": "<i class='fa fa-clock-o'></i>"
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPackage {
    #[serde(rename = "type")]
    pub package_type: PackageType,

    /// Unique package name.
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Artifact coordinate the interpreter resolves the package from.
    pub artifact: String,

    /// Entry point class (or symbol) inside the artifact.
    #[serde(default)]
    pub class_name: String,

    /// Resource patterns the application requires, grouped by alternative.
    #[serde(default)]
    pub resources: Vec<Vec<String>>,

    #[serde(default)]
    pub license: String,

    #[serde(default)]
    pub icon: String,
}

impl ApplicationPackage {
    /// Create a package with only its required fields set.
    pub fn new(
        package_type: PackageType,
        name: impl Into<String>,
        artifact: impl Into<String>,
    ) -> Self {
        Self {
            package_type,
            name: name.into(),
            description: String::new(),
            artifact: artifact.into(),
            class_name: String::new(),
            resources: Vec::new(),
            license: String::new(),
            icon: String::new(),
        }
    }

    pub fn with_class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = class_name.into();
        self
    }

    /// Serialize this package as the JSON payload sent with a load call.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Lifecycle status of an application bound to a paragraph.
///
/// Normal flow: Unloaded -> Loading -> Loaded -> Unloading -> Unloaded.
/// Running is transient: a run call happens while the status stays Loaded.
/// Any step may fall to Error.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Unloading,
    Error,
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApplicationStatus::Unloaded => "UNLOADED",
            ApplicationStatus::Loading => "LOADING",
            ApplicationStatus::Loaded => "LOADED",
            ApplicationStatus::Unloading => "UNLOADING",
            ApplicationStatus::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Type of an output chunk produced by an application.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputType {
    #[default]
    Text,
    Html,
    Angular,
    Table,
    Img,
    Svg,
    Null,
    Network,
}
