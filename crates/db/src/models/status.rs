//! Status helper enums mapping to SMALLSERIAL/SMALLINT lookup tables.
//!
//! Each enum variant's discriminant matches the seed data order (1-based)
//! in the corresponding `*_statuses` database table.

use imagegen_core::task::TaskStatus;

/// Status ID type matching SMALLINT/SMALLSERIAL in the database.
pub type StatusId = i16;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Return the database status ID.
            pub fn id(self) -> StatusId {
                self as StatusId
            }

            /// Look up a variant by its database status ID.
            pub fn from_id(id: StatusId) -> Option<Self> {
                $(
                    if id == $val {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }

        impl From<$name> for StatusId {
            fn from(value: $name) -> Self {
                value as StatusId
            }
        }
    };
}

define_status_enum! {
    /// Task lifecycle status (`task_statuses`).
    TaskStatusId {
        NotSubmitted = 1,
        Submitted = 2,
        Finished = 3,
        Error = 4,
    }
}

impl From<TaskStatus> for TaskStatusId {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::NotSubmitted => TaskStatusId::NotSubmitted,
            TaskStatus::Submitted => TaskStatusId::Submitted,
            TaskStatus::Finished => TaskStatusId::Finished,
            TaskStatus::Error => TaskStatusId::Error,
        }
    }
}

impl From<TaskStatusId> for TaskStatus {
    fn from(status: TaskStatusId) -> Self {
        match status {
            TaskStatusId::NotSubmitted => TaskStatus::NotSubmitted,
            TaskStatusId::Submitted => TaskStatus::Submitted,
            TaskStatusId::Finished => TaskStatus::Finished,
            TaskStatusId::Error => TaskStatus::Error,
        }
    }
}
