mod category_dto;

pub use category_dto::{
    BreadcrumbDto, CategoryQuery, CategoryResponseDto, CategoryTreeDto, CreateCategoryDto,
    ReparentCategoryDto, UpdateCategoryDto,
};
