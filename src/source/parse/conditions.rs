use std::cmp::Ordering;

/// Dotted numeric version, compared component-wise with zero padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version(Vec<u64>);

impl Version {
    /// Extracts the first dotted number run from `raw`.
    ///
    /// `"1.74.2"`, `"daemon 1.74.2-beta"` and `"Linux rpm 2"` all parse; a
    /// string with no digits does not.
    pub fn parse(raw: &str) -> Option<Self> {
        let start = raw.find(|c: char| c.is_ascii_digit())?;
        let run: String = raw[start..]
            .chars()
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        let parts = run
            .split('.')
            .filter(|p| !p.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<u64>, _>>()
            .ok()?;

        (!parts.is_empty()).then_some(Self(parts))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| {
                let a = self.0.get(i).copied().unwrap_or(0);
                let b = other.0.get(i).copied().unwrap_or(0);
                a.cmp(&b)
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

/// Platform facts that conditional XML directives are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditionals {
    groups: Vec<String>,
    hostname: Option<String>,
    platform_name: Option<String>,
    platform_version: Option<Version>,
    daemon_version: Option<Version>,
}

impl Conditionals {
    /// Conditionals for a node with the given groups and nothing else known.
    pub fn with_groups<S: AsRef<str>>(groups: &[S]) -> Self {
        Self {
            groups: groups
                .iter()
                .map(|g| g.as_ref().trim().to_ascii_lowercase())
                .filter(|g| !g.is_empty())
                .collect(),
            ..Self::default()
        }
    }

    /// Sets the node's fully qualified host name.
    pub fn hostname(mut self, hostname: Option<&str>) -> Self {
        self.hostname = hostname.map(str::to_ascii_lowercase);
        self
    }

    /// Sets the platform name and version string.
    pub fn platform(mut self, name: Option<&str>, version: Option<&str>) -> Self {
        self.platform_name = name.map(str::to_string);
        self.platform_version = version.and_then(Version::parse);
        self
    }

    /// Sets the daemon version string.
    pub fn daemon_version(mut self, version: Option<&str>) -> Self {
        self.daemon_version = version.and_then(Version::parse);
        self
    }

    /// Groups this node belongs to, lower-cased.
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// Evaluates one test attribute.
    ///
    /// # Errors
    /// Returns a message for unknown attributes and unparseable versions.
    pub fn test(&self, attr: &str, value: &str) -> Result<bool, String> {
        let result = match attr {
            "group" => list_items(value).any(|g| self.groups.contains(&g)),
            "hostname" => self
                .hostname
                .as_ref()
                .is_some_and(|h| list_items(value).any(|v| &v == h)),
            "platformName" => self
                .platform_name
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(value.trim())),
            "daemonVersion" => compare(&self.daemon_version, value, |o| o == Ordering::Equal)?,
            "daemonVersionMin" => compare(&self.daemon_version, value, |o| o != Ordering::Less)?,
            "daemonVersionMax" => compare(&self.daemon_version, value, |o| o != Ordering::Greater)?,
            "platformVersion" => compare(&self.platform_version, value, |o| o == Ordering::Equal)?,
            "platformVersionMin" => {
                compare(&self.platform_version, value, |o| o != Ordering::Less)?
            }
            "platformVersionMax" => {
                compare(&self.platform_version, value, |o| o != Ordering::Greater)?
            }
            other => return Err(format!("unknown conditional attribute '{other}'")),
        };

        Ok(result)
    }
}

fn list_items(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(';')
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
}

fn compare(
    actual: &Option<Version>,
    wanted: &str,
    accept: impl Fn(Ordering) -> bool,
) -> Result<bool, String> {
    let wanted = Version::parse(wanted).ok_or_else(|| format!("bad version '{wanted}'"))?;
    Ok(actual.as_ref().is_some_and(|v| accept(v.cmp(&wanted))))
}
