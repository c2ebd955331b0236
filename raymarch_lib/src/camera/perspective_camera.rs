use nalgebra::{vector, Point3, Vector2, Vector3};

use crate::common::{BoundBox, Ray, ViewportBox};

/// Ray-casting camera
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Position of the camera in world coordinates
    position: Point3<f32>,
    /// Up direction from the camera's perspective
    up: Vector3<f32>,
    /// Direction of camera, unit length
    direction: Vector3<f32>,
    /// Aspect ratio of image plane
    aspect: f32,
    /// Vertical Field of View in degrees
    fov_y: f32,
    /// Size of image plane at distance 1
    img_plane_size: Vector2<f32>,
    /// Vector from camera point to pixel \[0,0\] | upper left corner, in line with buffer convention
    dir_00: Vector3<f32>,
    /// Vector offset across the whole image plane horizontally
    du: Vector3<f32>,
    /// Vector offset across the whole image plane vertically, pointing down
    dv: Vector3<f32>,
}

impl PerspectiveCamera {
    /// Construct new camera
    ///
    /// The up direction is the positive y axis, unless the camera looks along it.
    /// Default fov is 60 degrees, default aspect ratio is 1.
    pub fn new(position: Point3<f32>, direction: Vector3<f32>) -> PerspectiveCamera {
        let mut camera = PerspectiveCamera {
            position,
            up: vector![0.0, 1.0, 0.0],
            direction: direction.normalize(),
            aspect: 1.0,
            fov_y: 60.0,
            img_plane_size: Vector2::zeros(),
            dir_00: Vector3::zeros(),
            du: Vector3::zeros(),
            dv: Vector3::zeros(),
        };
        camera.recalc_plane_size();
        camera.recalc_plane();
        camera
    }

    /// Camera at `position` looking at `target`
    pub fn looking_at(position: Point3<f32>, target: Point3<f32>) -> PerspectiveCamera {
        PerspectiveCamera::new(position, target - position)
    }

    /// Changes aspect ratio to match `(width, height)` resolution
    pub fn change_aspect_from_resolution(&mut self, width: usize, height: usize) {
        self.change_aspect((width as f32) / (height as f32));
    }

    /// Change vertical FoV of camera, in degrees. Values outside `(0;180)` are ignored.
    pub fn change_fov(&mut self, vertical_fov_deg: f32) {
        if !(vertical_fov_deg > 0.0 && vertical_fov_deg < 180.0) {
            log::warn!("Ignoring field of view {vertical_fov_deg}");
            return;
        }
        self.fov_y = vertical_fov_deg;
        self.recalc_plane_size();
        self.recalc_dudv();
    }

    /// Change aspect ratio of camera
    ///
    /// For example 1.7777 for 16:9 ratio
    pub fn change_aspect(&mut self, aspect_ratio: f32) {
        self.aspect = aspect_ratio;
        self.recalc_plane_size();
        self.recalc_dudv();
    }

    pub fn set_pos(&mut self, pos: Point3<f32>) {
        self.position = pos;
    }

    pub fn set_direction(&mut self, direction: Vector3<f32>) {
        self.direction = direction.normalize();
        self.recalc_plane();
    }

    /// Move camera by vector `delta`
    pub fn change_pos(&mut self, delta: Vector3<f32>) {
        self.position += delta;
    }

    pub fn get_position(&self) -> Point3<f32> {
        self.position
    }

    pub fn get_direction(&self) -> Vector3<f32> {
        self.direction
    }

    /// Width over height of the image plane
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    // Call when camera direction changed
    fn recalc_plane(&mut self) {
        let world_up = if self.direction.y.abs() > 0.999 {
            vector![0.0, 0.0, 1.0]
        } else {
            vector![0.0, 1.0, 0.0]
        };
        let right = self.direction.cross(&world_up).normalize();
        self.up = right.cross(&self.direction);
        self.recalc_dudv();
    }

    // Call when fov or aspect ratio changed
    fn recalc_plane_size(&mut self) {
        let height = 2.0 * f32::tan(f32::to_radians(0.5 * self.fov_y));
        self.img_plane_size = vector![height * self.aspect, height];
    }

    fn recalc_dudv(&mut self) {
        self.du = self.img_plane_size.x * self.direction.cross(&self.up).normalize();
        self.dv = -self.img_plane_size.y * self.up; // Notice '-' sign, rows go down
        self.dir_00 = self.direction - 0.5 * self.du - 0.5 * self.dv;
    }

    /// Get ray originating in the camera position crossing view plane in coordinates `pixel_coord`
    ///
    /// # Arguments
    ///
    /// * pixel_coord - Coordinates in the range of `<0;1>x<0;1>`, point \[0,0\] being upper left corner
    pub fn get_ray(&self, pixel_coord: (f32, f32)) -> Ray {
        let dir = self.dir_00 + self.du * pixel_coord.0 + self.dv * pixel_coord.1;
        Ray::new(self.position, dir)
    }

    /// Ray through the center of pixel `(x, y)` of a frame with `resolution`
    pub fn get_pixel_ray(&self, x: usize, y: usize, resolution: (usize, usize)) -> Ray {
        let u = (x as f32 + 0.5) / resolution.0 as f32;
        let v = (y as f32 + 0.5) / resolution.1 as f32;
        self.get_ray((u, v))
    }

    /// Project bounding box to viewport
    ///
    /// Resulting viewport box is the minimal rectangle containing the projected corners.
    /// If any corner lies behind the camera, the whole viewport is returned.
    pub fn project_box(&self, bound_box: BoundBox) -> ViewportBox {
        // Source: https://github.com/ospray/ospray, Intel corp., Apache 2.0 license
        let mut viewbox = ViewportBox::new();

        let du_len2 = self.du.norm_squared();
        let dv_len2 = self.dv.norm_squared();

        for point in bound_box {
            let v = point - self.position;
            let den = v.dot(&self.direction);
            if den <= f32::EPSILON {
                return ViewportBox::full();
            }
            // point on the image plane at distance 1
            let on_plane = v / den;
            let screen_dir = on_plane - self.dir_00;
            let x = screen_dir.dot(&self.du) / du_len2;
            let y = screen_dir.dot(&self.dv) / dv_len2;
            viewbox.add_point(x, y);
        }

        viewbox
    }

    /// Get the distance from camera origin to the middle of a bound box
    pub fn box_distance(&self, bound_box: &BoundBox) -> f32 {
        self.point_distance(&bound_box.center())
    }

    pub fn point_distance(&self, point: &Point3<f32>) -> f32 {
        (point - self.position).magnitude()
    }
}
