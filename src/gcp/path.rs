//! Resource path parsing
//!
//! GCP resources reference each other by URL, e.g.
//! `https://www.googleapis.com/compute/v1/projects/my-project/zones/us-central1-a/disks/disk1`
//! or the relative `projects/my-project/global/networks/default`.

/// The parts of a resource URL needed to build a linked item query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    pub project: String,
    /// Zone or region; `None` for global resources
    pub location: Option<String>,
    pub collection: String,
    pub name: String,
}

impl ResourcePath {
    /// Parse a full or relative resource URL.
    pub fn parse(url: &str) -> Option<Self> {
        let start = url.find("projects/")?;
        let mut parts = url[start..].split('/').filter(|s| !s.is_empty());

        if parts.next()? != "projects" {
            return None;
        }
        let project = parts.next()?.to_string();

        let (location, collection) = match parts.next()? {
            "zones" | "regions" | "locations" => {
                let location = parts.next()?.to_string();
                (Some(location), parts.next()?.to_string())
            }
            "global" => (None, parts.next()?.to_string()),
            other => (None, other.to_string()),
        };

        let name = parts.next()?.to_string();

        Some(Self {
            project,
            location,
            collection,
            name,
        })
    }

    /// The discovery scope this resource lives in.
    pub fn scope(&self) -> String {
        match &self.location {
            Some(location) => crate::scope::zonal(&self.project, location),
            None => crate::scope::project(&self.project),
        }
    }
}
