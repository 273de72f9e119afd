use super::admin::AdminView;
use super::donor::DonorView;
use crate::model::Role;

/// Top-level screen: role selection, or one of the two portals
#[derive(Debug, Clone, Default)]
pub enum Portal {
    #[default]
    RoleSelection,
    Donor(DonorView),
    Admin(AdminView),
}

impl Portal {
    /// Enter a portal; it starts in its loading state
    pub fn select(&mut self, role: Role) {
        *self = match role {
            Role::Donor => Portal::Donor(DonorView::new()),
            Role::Admin => Portal::Admin(AdminView::new()),
        };
    }

    pub fn back(&mut self) {
        *self = Portal::RoleSelection;
    }

    pub fn role(&self) -> Option<Role> {
        match self {
            Portal::RoleSelection => None,
            Portal::Donor(_) => Some(Role::Donor),
            Portal::Admin(_) => Some(Role::Admin),
        }
    }

    pub fn brand(&self) -> &'static str {
        match self {
            Portal::RoleSelection => "BloodNet",
            Portal::Donor(_) => "BloodNet Donor",
            Portal::Admin(_) => "BloodNet Admin",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::{AdminPage, DonorPage};

    #[test]
    fn test_select_and_back() {
        let mut portal = Portal::default();
        assert!(portal.role().is_none());

        portal.select(Role::Donor);
        match &portal {
            Portal::Donor(view) => assert_eq!(view.page, DonorPage::Loading),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(portal.brand(), "BloodNet Donor");

        portal.select(Role::Admin);
        match &portal {
            Portal::Admin(view) => assert_eq!(view.page, AdminPage::Loading),
            other => panic!("unexpected {other:?}"),
        }

        portal.back();
        assert!(matches!(portal, Portal::RoleSelection));
    }
}
