// Request descriptors
//
// One immutable description per logical call: action, mode, HTTP method and
// parameters. Built fresh for each call and dropped afterwards; the retry loop
// re-sends the same descriptor on every attempt.

use indexmap::IndexMap;
use strum::{Display, EnumString};

use crate::wire::RETURN_CODE;

/// API mode selecting read, write, or verify semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum Mode {
    #[strum(to_string = "read", serialize = "1")]
    Read,
    #[strum(to_string = "write", serialize = "0")]
    Write,
    #[strum(to_string = "verify", serialize = "2")]
    Verify,
}

impl Mode {
    /// The literal value sent in the `mode` parameter.
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Read => "1",
            Self::Write => "0",
            Self::Verify => "2",
        }
    }
}

/// HTTP method used for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Method {
    #[strum(to_string = "GET")]
    Get,
    #[strum(to_string = "POST")]
    Post,
}

/// Everything needed to issue one logical request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    action: String,
    mode: Mode,
    method: Method,
    params: IndexMap<String, String>,
}

impl RequestDescriptor {
    /// A read (`mode=1`) request, sent as GET.
    pub fn read(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            mode: Mode::Read,
            method: Method::Get,
            params: IndexMap::new(),
        }
    }

    /// A write (`mode=0`) request, sent as POST.
    ///
    /// `returnCode` is read-only on the device and is stripped from `params`.
    pub fn write<I, K, V>(action: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::mutation(action, Mode::Write, params)
    }

    /// A verify (`mode=2`) request, sent as POST with the same stripping rules as writes.
    pub fn verify<I, K, V>(action: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::mutation(action, Mode::Verify, params)
    }

    /// Override the mode while keeping method and parameters.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    fn mutation<I, K, V>(action: impl Into<String>, mode: Mode, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k != RETURN_CODE)
            .collect();
        Self {
            action: action.into(),
            mode,
            method: Method::Post,
            params,
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn params(&self) -> &IndexMap<String, String> {
        &self.params
    }

    /// Full ordered pair list: `action`, `mode`, then the parameters.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::with_capacity(self.params.len() + 2);
        pairs.push(("action", self.action.as_str()));
        pairs.push(("mode", self.mode.as_wire()));
        pairs.extend(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        pairs
    }

    /// `k=v, k=v` rendering for diagnostics.
    pub fn describe_params(&self) -> String {
        self.params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
