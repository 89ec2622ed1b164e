mod data_loader;

pub use data_loader::{DataLoader, DataLoaderState, LoadTicket};

pub mod prelude {
    pub use super::data_loader::DataLoaderHandle;
    pub mod helper_hooks {
        pub use super::super::data_loader::use_data_loader;
    }
}
