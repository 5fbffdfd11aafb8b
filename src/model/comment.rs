use serde_json::{Map, Value};

use crate::error::IsaError;
use crate::model::dict::{IsaDict, LdContext, as_object, finish, str_field};
use crate::model::store::LoaderStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Comment {
    pub name: String,
    pub value: String,
}

impl Comment {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Lookup helpers shared by every entity carrying an ordered comment list.
pub trait Commentable {
    fn comments(&self) -> &[Comment];

    fn comments_mut(&mut self) -> &mut Vec<Comment>;

    fn add_comment(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.comments_mut().push(Comment::new(name, value));
    }

    fn get_comment(&self, name: &str) -> Option<&Comment> {
        self.comments().iter().find(|comment| comment.name == name)
    }
}

impl IsaDict for Comment {
    const LD_TYPE: &'static str = "Comment";

    fn to_dict(&self, ld: Option<&LdContext>) -> Value {
        let mut map = Map::new();
        map.insert("name".to_string(), Value::String(self.name.clone()));
        map.insert("value".to_string(), Value::String(self.value.clone()));
        finish(ld, Self::LD_TYPE, map)
    }

    fn from_dict(value: &Value, _store: &mut LoaderStore) -> Result<Self, IsaError> {
        let map = as_object(value, "Comment")?;
        Ok(Self {
            name: str_field(map, "Comment", "name")?,
            value: str_field(map, "Comment", "value")?,
        })
    }
}

#[macro_export]
#[doc(hidden)]
macro_rules! impl_commentable {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::model::comment::Commentable for $ty {
                fn comments(&self) -> &[$crate::model::comment::Comment] {
                    &self.comments
                }

                fn comments_mut(&mut self) -> &mut Vec<$crate::model::comment::Comment> {
                    &mut self.comments
                }
            }
        )+
    };
}
