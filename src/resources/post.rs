use crate::db::PostRecord;
use crate::resources::OwnedResource;
use crate::validation::{FieldSpec, Rule, Schema};

/// Blog posts.
pub struct Post;

impl OwnedResource for Post {
    type Record = PostRecord;

    const TABLE: &'static str = "post";
    const COLLECTION_PATH: &'static str = "/posts";
    const ITEM_PATH: &'static str = "/posts/{id}";
    const FIELDS: &'static str = "title, body, completed, owner, created_at, updated_at";
    const SCHEMA: Schema = Schema {
        resource: "post",
        fields: &[
            FieldSpec {
                name: "title",
                rules: &[Rule::Required, Rule::Text, Rule::Trim, Rule::NonEmpty],
            },
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
    const UPDATABLE: &'static [&'static str] = &["title", "body"];
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("title", "title"),
        ("body", "body"),
        ("completed", "completed"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ];
}
