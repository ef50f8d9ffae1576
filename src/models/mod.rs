pub mod task;
pub mod user;

pub use task::{
    FocusSessionRequest, Task, TaskCreate, TaskListQuery, TaskOverview, TaskPriority,
    TaskStatus, TaskUpdate,
};
pub use user::{NewUser, User, UserProfile};
