use crate::db::CommentRecord;
use crate::resources::OwnedResource;
use crate::validation::{FieldSpec, Rule, Schema};

/// Comments. Same ownership rules as posts, but only `body` is editable.
pub struct Comment;

impl OwnedResource for Comment {
    type Record = CommentRecord;

    const TABLE: &'static str = "comment";
    const COLLECTION_PATH: &'static str = "/comments";
    const ITEM_PATH: &'static str = "/comments/{id}";
    const FIELDS: &'static str = "body, completed, owner, created_at, updated_at";
    const SCHEMA: Schema = Schema {
        resource: "comment",
        fields: &[
            FieldSpec {
                name: "body",
                rules: &[Rule::Required, Rule::Text, Rule::Trim, Rule::NonEmpty],
            },
            FieldSpec {
                name: "completed",
                rules: &[Rule::Boolean],
            },
        ],
    };
    const UPDATABLE: &'static [&'static str] = &["body"];
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("body", "body"),
        ("completed", "completed"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ];
}
