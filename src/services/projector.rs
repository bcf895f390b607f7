//! 可见性投影
//!
//! 根据解析器给出的完整/受限结论选择输出字段。纯函数，不访问存储。

use crate::models::{Diet, Exercise, Product, Training};
use serde::Serialize;
use uuid::Uuid;

/// 带 `access` 判别字段的输出
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "access", rename_all = "lowercase")]
pub enum ResourceView<F, L> {
    Full(F),
    Limited(L),
}

impl<F, L> ResourceView<F, L> {
    pub fn is_full(&self) -> bool {
        matches!(self, ResourceView::Full(_))
    }
}

/// 资源的受限字段集合
pub trait Projectable: Serialize {
    type Limited: Serialize;

    fn limited(&self) -> Self::Limited;
}

pub type Projected<T> = ResourceView<T, <T as Projectable>::Limited>;

/// 投影单个资源
pub fn project<T: Projectable>(resource: T, full_access: bool) -> Projected<T> {
    if full_access {
        ResourceView::Full(resource)
    } else {
        ResourceView::Limited(resource.limited())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DietLimited {
    pub id: Uuid,
    pub name: String,
    pub calories: i32,
    pub reusable: bool,
}

impl Projectable for Diet {
    type Limited = DietLimited;

    fn limited(&self) -> DietLimited {
        DietLimited {
            id: self.id,
            name: self.name.clone(),
            calories: self.calories,
            reusable: self.reusable,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingLimited {
    pub id: Uuid,
    pub name: String,
    pub coach_id: Option<Uuid>,
    pub reusable: bool,
}

impl Projectable for Training {
    type Limited = TrainingLimited;

    fn limited(&self) -> TrainingLimited {
        TrainingLimited {
            id: self.id,
            name: self.name.clone(),
            coach_id: self.coach_id,
            reusable: self.reusable,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseLimited {
    pub id: Uuid,
    pub name: String,
    pub exercise_type: String,
}

impl Projectable for Exercise {
    type Limited = ExerciseLimited;

    fn limited(&self) -> ExerciseLimited {
        ExerciseLimited {
            id: self.id,
            name: self.name.clone(),
            exercise_type: self.exercise_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductLimited {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
}

impl Projectable for Product {
    type Limited = ProductLimited;

    fn limited(&self) -> ProductLimited {
        ProductLimited {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
        }
    }
}
