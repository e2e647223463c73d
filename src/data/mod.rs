pub mod augmentation;
