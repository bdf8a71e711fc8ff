use serde::{Deserialize, Serialize};

/// One row shape of a [`FieldArray`].
pub trait Record {
    /// A single-field edit of this row.
    type Update;

    /// Whether the row is complete enough to be submitted.
    fn is_present(&self) -> bool;

    fn apply(&mut self, update: Self::Update);
}

/// Ordered, append-only edit buffer of records of one shape.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldArray<T> {
    rows: Vec<T>,
}

impl<T> Default for FieldArray<T> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<T: Record + Clone> FieldArray<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self { rows }
    }

    /// Appends `record` and returns its index.
    pub fn append(&mut self, record: T) -> usize {
        self.rows.push(record);
        self.rows.len() - 1
    }

    /// Applies `update` to the row at `index`. Returns `false` and changes nothing when
    /// `index` is out of bounds.
    pub fn update(&mut self, index: usize, update: T::Update) -> bool {
        match self.rows.get_mut(index) {
            Some(row) => {
                row.apply(update);
                true
            }
            None => false,
        }
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Present rows in their original order, or `None` when no row qualifies.
    pub fn to_submission(&self) -> Option<Vec<T>> {
        let present: Vec<T> = self
            .rows
            .iter()
            .filter(|row| row.is_present())
            .cloned()
            .collect();
        (!present.is_empty()).then_some(present)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
}

/// Host to container port publication. An empty `host_port` lets the daemon pick, `"0"`
/// asks for a random port; both are forwarded as typed.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub host_port: String,
    pub container_port: String,
    pub protocol: Protocol,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum PortUpdate {
    HostPort(String),
    ContainerPort(String),
    Protocol(Protocol),
}

impl Record for PortMapping {
    type Update = PortUpdate;

    fn is_present(&self) -> bool {
        !self.host_port.is_empty() || !self.container_port.is_empty()
    }

    fn apply(&mut self, update: PortUpdate) {
        match update {
            PortUpdate::HostPort(value) => self.host_port = value,
            PortUpdate::ContainerPort(value) => self.container_port = value,
            PortUpdate::Protocol(value) => self.protocol = value,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMapping {
    pub host_path: String,
    pub container_path: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum VolumeUpdate {
    HostPath(String),
    ContainerPath(String),
}

impl Record for VolumeMapping {
    type Update = VolumeUpdate;

    fn is_present(&self) -> bool {
        !self.host_path.is_empty() && !self.container_path.is_empty()
    }

    fn apply(&mut self, update: VolumeUpdate) {
        match update {
            VolumeUpdate::HostPath(value) => self.host_path = value,
            VolumeUpdate::ContainerPath(value) => self.container_path = value,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct EnvVariable {
    pub name: String,
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum EnvUpdate {
    Name(String),
    Value(String),
}

impl Record for EnvVariable {
    type Update = EnvUpdate;

    fn is_present(&self) -> bool {
        !self.name.is_empty() && !self.value.is_empty()
    }

    fn apply(&mut self, update: EnvUpdate) {
        match update {
            EnvUpdate::Name(value) => self.name = value,
            EnvUpdate::Value(value) => self.value = value,
        }
    }
}
