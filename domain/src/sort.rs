use database_adapter::db::{SortDirection, SortKind, SortOrder};
use serde::{Deserialize, Serialize};

/// A column a listing may be ordered by. Each entity exposes a closed enum of
/// these, so unknown columns are rejected when the request is parsed.
pub trait SortColumn: Copy {
    fn field(self) -> &'static str;
    fn kind(self) -> SortKind;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort<C> {
    pub column: C,
    #[serde(default)]
    pub direction: SortDirection,
}

impl<C: SortColumn> Sort<C> {
    #[must_use]
    pub fn new(column: C, direction: SortDirection) -> Self {
        Self { column, direction }
    }

    #[must_use]
    pub fn asc(column: C) -> Self {
        Self::new(column, SortDirection::Asc)
    }

    #[must_use]
    pub fn desc(column: C) -> Self {
        Self::new(column, SortDirection::Desc)
    }

    #[must_use]
    pub fn order(&self) -> SortOrder {
        SortOrder {
            field: self.column.field(),
            kind: self.column.kind(),
            direction: self.direction,
        }
    }
}

/// Builds a `SortOrder` from optional query parts. A direction without a
/// column keeps the default creation order.
#[must_use]
pub fn resolve<C: SortColumn>(column: Option<C>, direction: Option<SortDirection>) -> Option<Sort<C>> {
    column.map(|column| Sort::new(column, direction.unwrap_or_default()))
}

macro_rules! sort_columns {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => ($field:literal, $kind:ident)),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $crate::sort::SortColumn for $name {
            fn field(self) -> &'static str {
                match self {
                    $($name::$variant => $field),+
                }
            }

            fn kind(self) -> database_adapter::db::SortKind {
                match self {
                    $($name::$variant => database_adapter::db::SortKind::$kind),+
                }
            }
        }
    };
}

pub(crate) use sort_columns;
