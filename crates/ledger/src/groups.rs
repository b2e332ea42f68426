//! A `Group` is the closed system inside which expenses and payments move
//! settlement credit between members. Money never enters or leaves a group;
//! it only changes who owes whom.

use sea_orm::{ActiveValue, entity::prelude::*};
use uuid::Uuid;

use crate::{Currency, LedgerError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub created_by: String,
    pub currency: Currency,
}

impl Group {
    pub fn new(name: String, created_by: &str, currency: Currency) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            created_by: created_by.to_string(),
            currency,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub created_by: String,
    pub currency: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::memberships::Entity")]
    Memberships,
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::memberships::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Group> for ActiveModel {
    fn from(group: &Group) -> Self {
        Self {
            id: ActiveValue::Set(group.id.clone()),
            name: ActiveValue::Set(group.name.clone()),
            created_by: ActiveValue::Set(group.created_by.clone()),
            currency: ActiveValue::Set(group.currency.code().to_string()),
        }
    }
}

impl TryFrom<Model> for Group {
    type Error = LedgerError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            created_by: model.created_by,
            currency: Currency::try_from(model.currency.as_str())?,
        })
    }
}
