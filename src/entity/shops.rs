use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "shops")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub owner_id: Option<Uuid>,
    pub shop_name: String,
    pub owner_name: String,
    pub location: String,
    pub contact: String,
    pub email: Option<String>,
    pub business_type: Option<String>,
    pub address: Option<String>,
    pub is_active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shop_owners::Entity",
        from = "Column::OwnerId",
        to = "super::shop_owners::Column::Id",
        on_delete = "SetNull"
    )]
    ShopOwners,
}

impl Related<super::shop_owners::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ShopOwners.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
