//! Generic and internet password items.

use std::fmt;
use std::time::SystemTime;

use serde::Serialize;
use zeroize::Zeroizing;

use super::item::{Attributes, Item, ItemClass, KeychainItem, Overlay};

/// A password value that never shows up in debug output.
#[derive(Clone, Default)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(Zeroizing::new(value.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, Default)]
pub struct PasswordAttributes {
    pub label: Option<String>,
    pub account: Option<String>,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub invisible: bool,
    pub negative: bool,
    pub password: Option<Secret>,
    pub creation_date: Option<SystemTime>,
    pub modification_date: Option<SystemTime>,
}

#[derive(Debug, Clone, Default)]
pub struct PasswordChanges {
    pub label: Option<String>,
    pub account: Option<String>,
    pub description: Option<String>,
    pub comment: Option<String>,
    pub invisible: Option<bool>,
    pub negative: Option<bool>,
    pub password: Option<Secret>,
}

impl PasswordChanges {
    fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.account.is_none()
            && self.description.is_none()
            && self.comment.is_none()
            && self.invisible.is_none()
            && self.negative.is_none()
            && self.password.is_none()
    }
}

impl Attributes for PasswordAttributes {
    type Changes = PasswordChanges;

    fn apply(&mut self, changes: &PasswordChanges) {
        if changes.is_empty() {
            return;
        }
        let now = SystemTime::now();
        if self.creation_date.is_none() {
            self.creation_date = Some(now);
        }
        self.modification_date = Some(now);
        if let Some(v) = &changes.label {
            self.label = Some(v.clone());
        }
        if let Some(v) = &changes.account {
            self.account = Some(v.clone());
        }
        if let Some(v) = &changes.description {
            self.description = Some(v.clone());
        }
        if let Some(v) = &changes.comment {
            self.comment = Some(v.clone());
        }
        if let Some(v) = changes.invisible {
            self.invisible = v;
        }
        if let Some(v) = changes.negative {
            self.negative = v;
        }
        if let Some(v) = &changes.password {
            self.password = Some(v.clone());
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GenericPasswordAttributes {
    pub common: PasswordAttributes,
    pub service: Option<String>,
    pub app_specific_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct GenericPasswordChanges {
    pub common: PasswordChanges,
    pub service: Option<String>,
    pub app_specific_data: Option<Vec<u8>>,
}

impl Attributes for GenericPasswordAttributes {
    type Changes = GenericPasswordChanges;

    fn apply(&mut self, changes: &GenericPasswordChanges) {
        self.common.apply(&changes.common);
        if let Some(v) = &changes.service {
            self.service = Some(v.clone());
        }
        if let Some(v) = &changes.app_specific_data {
            self.app_specific_data = Some(v.clone());
        }
    }
}

/// A password for an application-defined service.
#[derive(Debug, Clone)]
pub struct GenericPassword {
    attrs: Overlay<GenericPasswordAttributes>,
}

impl GenericPassword {
    pub fn new(service: impl Into<String>, account: impl Into<String>, password: Secret) -> Self {
        let mut attrs = Overlay::new(GenericPasswordAttributes::default());
        let (service, account) = (service.into(), account.into());
        attrs.stage(|c| {
            c.service = Some(service);
            c.common.account = Some(account);
            c.common.password = Some(password);
        });
        Self { attrs }
    }

    pub fn service(&self) -> Option<&str> {
        self.attrs.read(|c| c.service.as_deref(), |b| b.service.as_deref())
    }

    pub fn set_service(&mut self, service: impl Into<String>) {
        let service = service.into();
        self.attrs.stage(|c| c.service = Some(service));
    }

    pub fn account(&self) -> Option<&str> {
        self.attrs
            .read(|c| c.common.account.as_deref(), |b| b.common.account.as_deref())
    }

    pub fn set_account(&mut self, account: impl Into<String>) {
        let account = account.into();
        self.attrs.stage(|c| c.common.account = Some(account));
    }

    pub fn password(&self) -> Option<&Secret> {
        self.attrs
            .read(|c| c.common.password.as_ref(), |b| b.common.password.as_ref())
    }

    pub fn set_password(&mut self, password: Secret) {
        self.attrs.stage(|c| c.common.password = Some(password));
    }

    pub fn label(&self) -> Option<&str> {
        self.attrs
            .read(|c| c.common.label.as_deref(), |b| b.common.label.as_deref())
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        self.attrs.stage(|c| c.common.label = Some(label));
    }

    pub fn comment(&self) -> Option<&str> {
        self.attrs
            .read(|c| c.common.comment.as_deref(), |b| b.common.comment.as_deref())
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        let comment = comment.into();
        self.attrs.stage(|c| c.common.comment = Some(comment));
    }

    pub fn is_invisible(&self) -> bool {
        self.attrs
            .read(|c| c.common.invisible.as_ref(), |b| Some(&b.common.invisible))
            .copied()
            .unwrap_or(false)
    }

    pub fn set_invisible(&mut self, invisible: bool) {
        self.attrs.stage(|c| c.common.invisible = Some(invisible));
    }

    pub fn app_specific_data(&self) -> Option<&[u8]> {
        self.attrs
            .read(|c| c.app_specific_data.as_deref(), |b| b.app_specific_data.as_deref())
    }

    pub fn creation_date(&self) -> Option<SystemTime> {
        self.attrs.base().common.creation_date
    }

    pub fn modification_date(&self) -> Option<SystemTime> {
        self.attrs.base().common.modification_date
    }
}

impl KeychainItem for GenericPassword {
    type Attributes = GenericPasswordAttributes;
    const CLASS: ItemClass = ItemClass::GenericPassword;

    fn overlay(&self) -> &Overlay<GenericPasswordAttributes> {
        &self.attrs
    }

    fn overlay_mut(&mut self) -> &mut Overlay<GenericPasswordAttributes> {
        &mut self.attrs
    }

    fn into_item(self) -> Item {
        Item::GenericPassword(self)
    }

    fn from_item(item: Item) -> Option<Self> {
        match item {
            Item::GenericPassword(p) => Some(p),
            _ => None,
        }
    }
}

/// Network protocol of an internet password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Protocol {
    #[default]
    Any,
    Ftp,
    FtpAccount,
    Http,
    Irc,
    Nntp,
    Pop3,
    Smtp,
    Socks,
    Imap,
    Ldap,
    AppleTalk,
    Afp,
    Telnet,
    Ssh,
    Ftps,
    Https,
    HttpProxy,
    HttpsProxy,
    FtpProxy,
    Smb,
    Rtsp,
    RtspProxy,
    Daap,
    Eppc,
    Ipp,
    Nntps,
    Ldaps,
    TelnetS,
    Imaps,
    Ircs,
    Pop3s,
}

impl Protocol {
    /// Four-character platform code; `None` for [`Protocol::Any`].
    pub fn as_str(self) -> Option<&'static str> {
        let code = match self {
            Protocol::Any => return None,
            Protocol::Ftp => "ftp ",
            Protocol::FtpAccount => "ftpa",
            Protocol::Http => "http",
            Protocol::Irc => "irc ",
            Protocol::Nntp => "nntp",
            Protocol::Pop3 => "pop3",
            Protocol::Smtp => "smtp",
            Protocol::Socks => "sox ",
            Protocol::Imap => "imap",
            Protocol::Ldap => "ldap",
            Protocol::AppleTalk => "atlk",
            Protocol::Afp => "afp ",
            Protocol::Telnet => "teln",
            Protocol::Ssh => "ssh ",
            Protocol::Ftps => "ftps",
            Protocol::Https => "htps",
            Protocol::HttpProxy => "htpx",
            Protocol::HttpsProxy => "htsx",
            Protocol::FtpProxy => "ftpx",
            Protocol::Smb => "smb ",
            Protocol::Rtsp => "rtsp",
            Protocol::RtspProxy => "rtsx",
            Protocol::Daap => "daap",
            Protocol::Eppc => "eppc",
            Protocol::Ipp => "ipp ",
            Protocol::Nntps => "ntps",
            Protocol::Ldaps => "ldps",
            Protocol::TelnetS => "tels",
            Protocol::Imaps => "imps",
            Protocol::Ircs => "ircs",
            Protocol::Pop3s => "pops",
        };
        Some(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AuthenticationType {
    #[default]
    Any,
    Ntlm,
    Msn,
    Dpa,
    Rpa,
    HttpBasic,
    HttpDigest,
    HtmlForm,
    Default,
}

impl AuthenticationType {
    pub fn as_str(self) -> Option<&'static str> {
        let code = match self {
            AuthenticationType::Any => return None,
            AuthenticationType::Ntlm => "ntlm",
            AuthenticationType::Msn => "msna",
            AuthenticationType::Dpa => "dpaa",
            AuthenticationType::Rpa => "rpaa",
            AuthenticationType::HttpBasic => "http",
            AuthenticationType::HttpDigest => "httd",
            AuthenticationType::HtmlForm => "form",
            AuthenticationType::Default => "dflt",
        };
        Some(code)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InternetPasswordAttributes {
    pub common: PasswordAttributes,
    pub server: Option<String>,
    pub security_domain: Option<String>,
    pub protocol: Protocol,
    pub authentication_type: AuthenticationType,
    pub port: Option<u16>,
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct InternetPasswordChanges {
    pub common: PasswordChanges,
    pub server: Option<String>,
    pub security_domain: Option<String>,
    pub protocol: Option<Protocol>,
    pub authentication_type: Option<AuthenticationType>,
    pub port: Option<u16>,
    pub path: Option<String>,
}

impl Attributes for InternetPasswordAttributes {
    type Changes = InternetPasswordChanges;

    fn apply(&mut self, changes: &InternetPasswordChanges) {
        self.common.apply(&changes.common);
        if let Some(v) = &changes.server {
            self.server = Some(v.clone());
        }
        if let Some(v) = &changes.security_domain {
            self.security_domain = Some(v.clone());
        }
        if let Some(v) = changes.protocol {
            self.protocol = v;
        }
        if let Some(v) = changes.authentication_type {
            self.authentication_type = v;
        }
        if let Some(v) = changes.port {
            self.port = Some(v);
        }
        if let Some(v) = &changes.path {
            self.path = Some(v.clone());
        }
    }
}

/// A password for a network server.
#[derive(Debug, Clone)]
pub struct InternetPassword {
    attrs: Overlay<InternetPasswordAttributes>,
}

impl InternetPassword {
    pub fn new(
        server: impl Into<String>,
        account: impl Into<String>,
        protocol: Protocol,
        password: Secret,
    ) -> Self {
        let mut attrs = Overlay::new(InternetPasswordAttributes::default());
        let (server, account) = (server.into(), account.into());
        attrs.stage(|c| {
            c.server = Some(server);
            c.protocol = Some(protocol);
            c.common.account = Some(account);
            c.common.password = Some(password);
        });
        Self { attrs }
    }

    pub fn server(&self) -> Option<&str> {
        self.attrs.read(|c| c.server.as_deref(), |b| b.server.as_deref())
    }

    pub fn account(&self) -> Option<&str> {
        self.attrs
            .read(|c| c.common.account.as_deref(), |b| b.common.account.as_deref())
    }

    pub fn password(&self) -> Option<&Secret> {
        self.attrs
            .read(|c| c.common.password.as_ref(), |b| b.common.password.as_ref())
    }

    pub fn set_password(&mut self, password: Secret) {
        self.attrs.stage(|c| c.common.password = Some(password));
    }

    pub fn label(&self) -> Option<&str> {
        self.attrs
            .read(|c| c.common.label.as_deref(), |b| b.common.label.as_deref())
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        let label = label.into();
        self.attrs.stage(|c| c.common.label = Some(label));
    }

    pub fn protocol(&self) -> Protocol {
        self.attrs
            .read(|c| c.protocol.as_ref(), |b| Some(&b.protocol))
            .copied()
            .unwrap_or_default()
    }

    pub fn authentication_type(&self) -> AuthenticationType {
        self.attrs
            .read(|c| c.authentication_type.as_ref(), |b| Some(&b.authentication_type))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_authentication_type(&mut self, auth: AuthenticationType) {
        self.attrs.stage(|c| c.authentication_type = Some(auth));
    }

    pub fn port(&self) -> Option<u16> {
        self.attrs.read(|c| c.port.as_ref(), |b| b.port.as_ref()).copied()
    }

    pub fn set_port(&mut self, port: u16) {
        self.attrs.stage(|c| c.port = Some(port));
    }

    pub fn path(&self) -> Option<&str> {
        self.attrs.read(|c| c.path.as_deref(), |b| b.path.as_deref())
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        self.attrs.stage(|c| c.path = Some(path));
    }

    pub fn security_domain(&self) -> Option<&str> {
        self.attrs
            .read(|c| c.security_domain.as_deref(), |b| b.security_domain.as_deref())
    }
}

impl KeychainItem for InternetPassword {
    type Attributes = InternetPasswordAttributes;
    const CLASS: ItemClass = ItemClass::InternetPassword;

    fn overlay(&self) -> &Overlay<InternetPasswordAttributes> {
        &self.attrs
    }

    fn overlay_mut(&mut self) -> &mut Overlay<InternetPasswordAttributes> {
        &mut self.attrs
    }

    fn into_item(self) -> Item {
        Item::InternetPassword(self)
    }

    fn from_item(item: Item) -> Option<Self> {
        match item {
            Item::InternetPassword(p) => Some(p),
            _ => None,
        }
    }
}
