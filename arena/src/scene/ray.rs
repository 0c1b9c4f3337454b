use std::cmp::Ordering;

use nalgebra::{Point2, Vector2};

pub struct Ray {
    origin: Point2<f32>,
    direction: Vector2<f32>,
}

impl Ray {
    pub fn from_origin_angle(origin: Point2<f32>, angle: f32) -> Self {
        Self {
            origin,
            direction: Vector2::new(angle.cos(), angle.sin()),
        }
    }
}

pub trait Intersect {
    /// Returns the intersection between the object and the `Ray` as a
    /// length `u` along the `direction` of the ray such that the
    /// intersection point can be described by `ray.origin + u*ray.direction`,
    /// or `None` if no intersection occurs.
    fn intersect(&self, ray: &Ray) -> Option<f32>;
}

pub struct LineSegment {
    p1: Point2<f32>,
    p2: Point2<f32>,
}

impl LineSegment {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            p1: Point2::new(x1, y1),
            p2: Point2::new(x2, y2),
        }
    }
}

impl Intersect for LineSegment {
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        let x1 = self.p1.x;
        let y1 = self.p1.y;
        let x2 = self.p2.x;
        let y2 = self.p2.y;

        let x3 = ray.origin.x;
        let y3 = ray.origin.y;
        let x4 = ray.origin.x + ray.direction.x;
        let y4 = ray.origin.y + ray.direction.y;

        let denom = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);

        // make sure lines are not parallell
        if denom == 0.0 {
            return None;
        }

        let t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / denom;
        let u = -((x1 - x2) * (y1 - y3) - (y1 - y2) * (x1 - x3)) / denom;

        if (0.0..=1.0).contains(&t) && u > 0.0 {
            return Some(u);
        }
        None
    }
}

/// The body of a robot.
pub struct Circle {
    center: Point2<f32>,
    radius: f32,
}

impl Circle {
    pub fn new(center: Point2<f32>, radius: f32) -> Self {
        Self { center, radius }
    }
}

impl Intersect for Circle {
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        // assumes a unit direction
        let oc = ray.origin - self.center;
        let b = oc.dot(&ray.direction);
        let c = oc.dot(&oc) - self.radius * self.radius;

        let disc = b * b - c;
        if disc < 0.0 {
            return None;
        }

        let near = -b - disc.sqrt();
        let far = -b + disc.sqrt();
        if near >= 0.0 {
            Some(near)
        } else if far >= 0.0 {
            // origin inside the circle
            Some(0.0)
        } else {
            None
        }
    }
}

/// The static walls of the arena.
pub struct Scene {
    objects: Vec<Box<dyn Intersect + Send + Sync>>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    pub fn add(&mut self, obj: Box<dyn Intersect + Send + Sync>) -> &mut Self {
        self.objects.push(obj);
        self
    }

    pub fn add_rect(&mut self, origin: Point2<f32>, size: Vector2<f32>) -> &mut Self {
        self.add(Box::new(LineSegment::new(
            origin.x,
            origin.y,
            origin.x + size.x,
            origin.y,
        )))
        .add(Box::new(LineSegment::new(
            origin.x + size.x,
            origin.y,
            origin.x + size.x,
            origin.y + size.y,
        )))
        .add(Box::new(LineSegment::new(
            origin.x + size.x,
            origin.y + size.y,
            origin.x,
            origin.y + size.y,
        )))
        .add(Box::new(LineSegment::new(
            origin.x,
            origin.y + size.y,
            origin.x,
            origin.y,
        )))
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Intersect for Scene {
    fn intersect(&self, ray: &Ray) -> Option<f32> {
        // keep lowest u value to only get closest intersection
        self.objects
            .iter()
            .filter_map(|o| o.intersect(ray))
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Less))
    }
}

#[cfg(test)]
mod test {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn segment_intersection() {
        let ray = Ray::from_origin_angle(Point2::new(0.0, 0.0), 0.0);
        let line = LineSegment::new(2.0, 2.0, 2.0, -2.0);
        assert_relative_eq!(line.intersect(&ray).unwrap(), 2.0);

        let behind = Ray::from_origin_angle(Point2::new(3.0, 0.0), 0.0);
        assert!(line.intersect(&behind).is_none());
    }

    #[test]
    fn scene_keeps_closest() {
        let ray = Ray::from_origin_angle(Point2::new(1.0, 1.0), 0.0);

        let mut scene = Scene::new();
        scene.add_rect(Point2::new(0.0, 0.0), Vector2::new(10.0, 10.0));
        scene.add(Box::new(LineSegment::new(4.0, 0.0, 4.0, 10.0)));

        assert_relative_eq!(scene.intersect(&ray).unwrap(), 3.0);
    }

    #[test]
    fn circle_intersection() {
        let circle = Circle::new(Point2::new(5.0, 0.0), 1.0);

        let ray = Ray::from_origin_angle(Point2::new(0.0, 0.0), 0.0);
        assert_relative_eq!(circle.intersect(&ray).unwrap(), 4.0);

        let miss = Ray::from_origin_angle(Point2::new(0.0, 0.0), std::f32::consts::FRAC_PI_2);
        assert!(circle.intersect(&miss).is_none());

        let inside = Ray::from_origin_angle(Point2::new(5.5, 0.0), 0.0);
        assert_eq!(circle.intersect(&inside), Some(0.0));

        let away = Ray::from_origin_angle(Point2::new(0.0, 0.0), std::f32::consts::PI);
        assert!(circle.intersect(&away).is_none());
    }
}
