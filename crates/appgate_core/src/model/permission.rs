//! Closed permission taxonomy for app authorization.
//!
//! # Responsibility
//! - Define every permission an app can be granted as one enum variant.
//! - Map variants to stable `"<category>.<code>"` identifiers and back.
//!
//! # Invariants
//! - Identifiers are unique across categories.
//! - The persisted registry is synchronized from `Permission::ALL`, so the
//!   enum is the only place new permissions are declared.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Effective permission set of one app.
pub type PermissionSet = BTreeSet<Permission>;

/// Permission an app may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Permission {
    ManageUsers,
    ManageStaff,
    ManageApps,
    ManageCheckouts,
    ManageDiscounts,
    ManageGiftCards,
    ManageMenus,
    ManageOrders,
    ViewOrders,
    ManagePages,
    ManagePlugins,
    ManageProducts,
    ViewProducts,
    ManageShipping,
    ManageSettings,
    ManageTranslations,
}

impl Permission {
    /// Every declared permission, in registry order.
    pub const ALL: [Permission; 16] = [
        Self::ManageUsers,
        Self::ManageStaff,
        Self::ManageApps,
        Self::ManageCheckouts,
        Self::ManageDiscounts,
        Self::ManageGiftCards,
        Self::ManageMenus,
        Self::ManageOrders,
        Self::ViewOrders,
        Self::ManagePages,
        Self::ManagePlugins,
        Self::ManageProducts,
        Self::ViewProducts,
        Self::ManageShipping,
        Self::ManageSettings,
        Self::ManageTranslations,
    ];

    /// Owning category (the part before the dot).
    pub fn category(self) -> &'static str {
        match self {
            Self::ManageUsers | Self::ManageStaff => "accounts",
            Self::ManageApps => "apps",
            Self::ManageCheckouts => "checkouts",
            Self::ManageDiscounts => "discounts",
            Self::ManageGiftCards => "giftcards",
            Self::ManageMenus => "menus",
            Self::ManageOrders | Self::ViewOrders => "orders",
            Self::ManagePages => "pages",
            Self::ManagePlugins => "plugins",
            Self::ManageProducts | Self::ViewProducts => "products",
            Self::ManageShipping => "shipping",
            Self::ManageSettings | Self::ManageTranslations => "site",
        }
    }

    /// Short code, unique within its category.
    pub fn codename(self) -> &'static str {
        match self {
            Self::ManageUsers => "manage_users",
            Self::ManageStaff => "manage_staff",
            Self::ManageApps => "manage_apps",
            Self::ManageCheckouts => "manage_checkouts",
            Self::ManageDiscounts => "manage_discounts",
            Self::ManageGiftCards => "manage_gift_cards",
            Self::ManageMenus => "manage_menus",
            Self::ManageOrders => "manage_orders",
            Self::ViewOrders => "view_orders",
            Self::ManagePages => "manage_pages",
            Self::ManagePlugins => "manage_plugins",
            Self::ManageProducts => "manage_products",
            Self::ViewProducts => "view_products",
            Self::ManageShipping => "manage_shipping",
            Self::ManageSettings => "manage_settings",
            Self::ManageTranslations => "manage_translations",
        }
    }

    /// Stable identifier in `"<category>.<code>"` form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ManageUsers => "accounts.manage_users",
            Self::ManageStaff => "accounts.manage_staff",
            Self::ManageApps => "apps.manage_apps",
            Self::ManageCheckouts => "checkouts.manage_checkouts",
            Self::ManageDiscounts => "discounts.manage_discounts",
            Self::ManageGiftCards => "giftcards.manage_gift_cards",
            Self::ManageMenus => "menus.manage_menus",
            Self::ManageOrders => "orders.manage_orders",
            Self::ViewOrders => "orders.view_orders",
            Self::ManagePages => "pages.manage_pages",
            Self::ManagePlugins => "plugins.manage_plugins",
            Self::ManageProducts => "products.manage_products",
            Self::ViewProducts => "products.view_products",
            Self::ManageShipping => "shipping.manage_shipping",
            Self::ManageSettings => "site.manage_settings",
            Self::ManageTranslations => "site.manage_translations",
        }
    }

    /// Human-readable label stored in the registry.
    pub fn description(self) -> &'static str {
        match self {
            Self::ManageUsers => "Manage customers.",
            Self::ManageStaff => "Manage staff.",
            Self::ManageApps => "Manage apps.",
            Self::ManageCheckouts => "Manage checkouts.",
            Self::ManageDiscounts => "Manage sales and vouchers.",
            Self::ManageGiftCards => "Manage gift cards.",
            Self::ManageMenus => "Manage navigation.",
            Self::ManageOrders => "Manage orders.",
            Self::ViewOrders => "View orders.",
            Self::ManagePages => "Manage pages.",
            Self::ManagePlugins => "Manage plugins.",
            Self::ManageProducts => "Manage products.",
            Self::ViewProducts => "View products.",
            Self::ManageShipping => "Manage shipping.",
            Self::ManageSettings => "Manage site settings.",
            Self::ManageTranslations => "Manage translations.",
        }
    }

    /// Resolves a registry `(category, codename)` pair.
    pub fn from_parts(category: &str, codename: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|perm| perm.category() == category && perm.codename() == codename)
    }
}

impl Display for Permission {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = PermissionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        parse_permission(value)
    }
}

impl TryFrom<String> for Permission {
    type Error = PermissionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_permission(&value)
    }
}

impl From<Permission> for String {
    fn from(value: Permission) -> Self {
        value.as_str().to_string()
    }
}

/// Parses one `"<category>.<code>"` identifier.
///
/// Surrounding whitespace is ignored; matching is case-sensitive.
pub fn parse_permission(value: &str) -> Result<Permission, PermissionParseError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(PermissionParseError::EmptyPermission);
    }

    Permission::ALL
        .into_iter()
        .find(|perm| perm.as_str() == normalized)
        .ok_or_else(|| PermissionParseError::UnknownPermission(normalized.to_string()))
}

/// Permission identifier parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionParseError {
    EmptyPermission,
    UnknownPermission(String),
}

impl Display for PermissionParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPermission => write!(f, "permission identifier must not be empty"),
            Self::UnknownPermission(value) => write!(f, "unknown permission: {value}"),
        }
    }
}

impl Error for PermissionParseError {}

#[cfg(test)]
mod tests {
    use super::{parse_permission, Permission, PermissionParseError};
    use std::collections::HashSet;

    #[test]
    fn identifiers_combine_category_and_codename() {
        for perm in Permission::ALL {
            assert_eq!(
                perm.as_str(),
                format!("{}.{}", perm.category(), perm.codename())
            );
        }
    }

    #[test]
    fn identifiers_are_globally_unique() {
        let unique: HashSet<&str> = Permission::ALL.iter().map(|perm| perm.as_str()).collect();
        assert_eq!(unique.len(), Permission::ALL.len());
    }

    #[test]
    fn parses_every_declared_identifier() {
        for perm in Permission::ALL {
            assert_eq!(parse_permission(perm.as_str()).unwrap(), perm);
            assert_eq!(
                Permission::from_parts(perm.category(), perm.codename()),
                Some(perm)
            );
        }
        assert_eq!(
            " orders.manage_orders ".parse::<Permission>().unwrap(),
            Permission::ManageOrders
        );
    }

    #[test]
    fn rejects_empty_and_unknown_identifiers() {
        assert_eq!(
            parse_permission("  ").unwrap_err(),
            PermissionParseError::EmptyPermission
        );
        assert_eq!(
            parse_permission("orders.refund_orders").unwrap_err(),
            PermissionParseError::UnknownPermission("orders.refund_orders".to_string())
        );
        assert!(parse_permission("Orders.Manage_Orders").is_err());
        assert_eq!(Permission::from_parts("order", "manage_orders"), None);
    }

    #[test]
    fn serializes_as_identifier_string() {
        let json = serde_json::to_string(&Permission::ViewOrders).unwrap();
        assert_eq!(json, "\"orders.view_orders\"");
        let parsed: Permission = serde_json::from_str("\"apps.manage_apps\"").unwrap();
        assert_eq!(parsed, Permission::ManageApps);
        assert!(serde_json::from_str::<Permission>("\"apps.unknown\"").is_err());
    }
}
