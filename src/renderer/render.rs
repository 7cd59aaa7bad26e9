use crate::error::RenderError;
use crate::model::AvatarModel;
use crate::renderer::renderer::WgpuSurface;
use crate::renderer::{Frame, RenderSurface, SceneUniform};

impl RenderSurface for WgpuSurface {
    fn container_size(&self) -> (u32, u32) {
        let size = self.window().inner_size();
        (size.width, size.height)
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.resize_gpu(width, height);
    }

    fn upload_model(&mut self, model: &AvatarModel) {
        self.upload_topology(model);
    }

    fn render(&mut self, frame: &Frame<'_>) -> Result<(), RenderError> {
        if !self.attached {
            return Ok(());
        }
        let overlay = self.overlay.take();
        let Some(gpu) = self.gpu.as_mut() else {
            return Ok(());
        };

        // Skip rendering if window size is invalid (minimized, not ready, etc.)
        if gpu.config.width == 0 || gpu.config.height == 0 {
            self.overlay = overlay;
            return Ok(());
        }

        let uniform = SceneUniform::from_frame(frame);
        gpu.queue
            .write_buffer(&gpu.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));

        let draw_model = gpu.num_indices > 0
            && !frame.vertices.is_empty()
            && frame.vertices.len() <= gpu.vertex_capacity;
        if draw_model {
            gpu.queue.write_buffer(
                &gpu.vertex_buffer,
                0,
                bytemuck::cast_slice(frame.vertices),
            );
        }

        let output = match gpu.surface.get_current_texture() {
            Ok(output) => output,
            Err(e) => {
                self.overlay = overlay;
                return Err(e.into());
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let [r, g, b, a] = frame.clear_color;
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Avatar Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: r as f64,
                            g: g as f64,
                            b: b as f64,
                            a: a as f64,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &gpu.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            if draw_model {
                render_pass.set_pipeline(&gpu.pipeline);
                render_pass.set_bind_group(0, &gpu.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, gpu.vertex_buffer.slice(..));
                render_pass.set_index_buffer(gpu.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..gpu.num_indices, 0, 0..1);
            }
        }

        if let Some(overlay) = overlay {
            for (id, image_delta) in &overlay.textures_delta.set {
                gpu.egui_renderer
                    .update_texture(&gpu.device, &gpu.queue, *id, image_delta);
            }

            gpu.egui_renderer.update_buffers(
                &gpu.device,
                &gpu.queue,
                &mut encoder,
                &overlay.paint_jobs,
                &overlay.screen_descriptor,
            );

            {
                let mut egui_rpass = encoder
                    .begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("egui render pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                            depth_slice: None,
                        })],
                        depth_stencil_attachment: None,
                        occlusion_query_set: None,
                        timestamp_writes: None,
                    })
                    .forget_lifetime();

                gpu.egui_renderer.render(
                    &mut egui_rpass,
                    &overlay.paint_jobs,
                    &overlay.screen_descriptor,
                );
            }

            for id in &overlay.textures_delta.free {
                gpu.egui_renderer.free_texture(id);
            }
        }

        gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn detach(&mut self) {
        self.attached = false;
    }

    fn release(&mut self) {
        if self.gpu.take().is_some() {
            log::info!("Render surface released");
        }
        self.overlay = None;
    }
}
