use crate::schema::UserRole;

const ACTION_TABLE: &[(UserRole, &[ActionType])] = &[
    (
        UserRole::Customer,
        &[
            ActionType::CreateRecipes,
            ActionType::ManageOwnRecipes,
            ActionType::Engage,
            ActionType::PlaceOrders,
            ActionType::ViewOwnOrders,
        ],
    ),
    (
        UserRole::Admin,
        &[
            ActionType::Engage,
            ActionType::ViewOwnOrders,
            ActionType::ManageProducts,
            ActionType::ManageOrders,
            ActionType::ViewAllOrders,
        ],
    ),
];

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionType {
    CreateRecipes,
    /// Editing and deleting; ownership is checked separately.
    ManageOwnRecipes,
    /// Likes, bookmarks and comments.
    Engage,

    PlaceOrders,
    ViewOwnOrders,

    ManageProducts,
    ManageOrders,
    ViewAllOrders,
}

impl ActionType {
    pub fn is_allowed_for(self, role: UserRole) -> bool {
        ACTION_TABLE
            .iter()
            .find(|(table_role, _)| *table_role == role)
            .map_or(false, |(_, actions)| actions.contains(&self))
    }
}
